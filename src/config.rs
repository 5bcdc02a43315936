//! Environment configuration
//!
//! Every setting comes from a `SENTINEL_*` variable with a default that
//! matches a stock local setup (Ollama on localhost, Coqui `tts`, `aplay`).

use crate::llm::OllamaConfig;
use crate::speech::SpeechConfig;
use crate::state_machine::PersistPolicy;
use crate::tools::{ExecutionPolicy, ToolContext};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com/";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_url: String,
    pub model: String,
    pub temperature: f32,
    pub search_url: String,
    pub tts_command: String,
    pub audio_player: String,
    pub audio_dir: PathBuf,
    pub memory_file: PathBuf,
    pub log_file: PathBuf,
    /// Tool paths and spawned commands resolve against this
    pub working_dir: PathBuf,
    pub allow_execute: bool,
    pub persist: PersistPolicy,
    pub history_window: Option<usize>,
    pub command_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let string = |var: &str, default: &str| get(var).unwrap_or_else(|| default.to_string());
        let path = |var: &str, default: &str| PathBuf::from(string(var, default));

        let working_dir = match get("SENTINEL_WORKING_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().map_err(ConfigError::WorkingDir)?,
        };

        Ok(Self {
            ollama_url: string("SENTINEL_OLLAMA_URL", DEFAULT_OLLAMA_URL),
            model: string("SENTINEL_MODEL", DEFAULT_MODEL),
            temperature: parse_temperature(get("SENTINEL_TEMPERATURE"))?,
            search_url: string("SENTINEL_SEARCH_URL", DEFAULT_SEARCH_URL),
            tts_command: string("SENTINEL_TTS_COMMAND", "tts"),
            audio_player: string("SENTINEL_AUDIO_PLAYER", "aplay"),
            audio_dir: get("SENTINEL_AUDIO_DIR").map_or_else(std::env::temp_dir, PathBuf::from),
            memory_file: path("SENTINEL_MEMORY_FILE", "memory.json"),
            log_file: path("SENTINEL_LOG_FILE", "skyscope.log"),
            working_dir,
            allow_execute: parse_bool("SENTINEL_ALLOW_EXECUTE", get("SENTINEL_ALLOW_EXECUTE"), true)?,
            persist: parse_persist(get("SENTINEL_PERSIST"))?,
            history_window: parse_optional_count(
                "SENTINEL_HISTORY_WINDOW",
                get("SENTINEL_HISTORY_WINDOW"),
            )?,
            command_timeout: parse_secs(
                "SENTINEL_COMMAND_TIMEOUT_SECS",
                get("SENTINEL_COMMAND_TIMEOUT_SECS"),
                60,
            )?,
            request_timeout: parse_secs(
                "SENTINEL_REQUEST_TIMEOUT_SECS",
                get("SENTINEL_REQUEST_TIMEOUT_SECS"),
                300,
            )?,
        })
    }

    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            url: self.ollama_url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            request_timeout: self.request_timeout,
        }
    }

    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig::new(&self.tts_command, &self.audio_player, self.audio_dir.clone())
    }

    pub fn tool_context(&self) -> ToolContext {
        let execution = if self.allow_execute {
            ExecutionPolicy::Enabled
        } else {
            ExecutionPolicy::Disabled
        };
        ToolContext::new(self.working_dir.clone(), &self.search_url)
            .with_command_timeout(self.command_timeout)
            .with_request_timeout(self.request_timeout)
            .with_execution(execution)
    }
}

fn invalid(var: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.into(),
    }
}

fn parse_temperature(value: Option<String>) -> Result<f32, ConfigError> {
    const VAR: &str = "SENTINEL_TEMPERATURE";
    let Some(value) = value else {
        return Ok(DEFAULT_TEMPERATURE);
    };
    match value.trim().parse::<f32>() {
        Ok(t) if t.is_finite() && t >= 0.0 => Ok(t),
        Ok(_) => Err(invalid(VAR, value, "must be a non-negative number")),
        Err(e) => Err(invalid(VAR, value, e.to_string())),
    }
}

fn parse_bool(var: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

fn parse_persist(value: Option<String>) -> Result<PersistPolicy, ConfigError> {
    let Some(value) = value else {
        return Ok(PersistPolicy::default());
    };
    PersistPolicy::parse(&value)
        .ok_or_else(|| invalid("SENTINEL_PERSIST", value, "expected every_message or user_input"))
}

fn parse_optional_count(var: &'static str, value: Option<String>) -> Result<Option<usize>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<usize>() {
        Ok(0) => Err(invalid(var, value, "must be at least 1")),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(invalid(var, value, e.to_string())),
    }
}

fn parse_secs(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default));
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid(var, value, "must be at least 1")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(invalid(var, value, e.to_string())),
    }
}
