//! Speech sequencer
//!
//! Synthesizes a reply to a per-agent audio file with an external TTS
//! command, then plays it with an external player. Both steps run to
//! completion in order; failures are logged and never reported upward.

use crate::persona::{AgentId, Voice};
use crate::tools::directive;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("code fence pattern is valid"));

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Synthesis command; may carry leading arguments (`python3 synthesize.py`)
    pub tts_command: String,
    pub audio_player: String,
    pub audio_dir: PathBuf,
    pub poll_interval: Duration,
    /// Upper bound on waiting for the audio file to settle
    pub settle_timeout: Duration,
}

impl SpeechConfig {
    pub fn new(
        tts_command: impl Into<String>,
        audio_player: impl Into<String>,
        audio_dir: PathBuf,
    ) -> Self {
        Self {
            tts_command: tts_command.into(),
            audio_player: audio_player.into(),
            audio_dir,
            poll_interval: Duration::from_millis(50),
            settle_timeout: Duration::from_secs(2),
        }
    }
}

pub struct SpeechSequencer {
    config: SpeechConfig,
}

impl SpeechSequencer {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Fixed audio artifact for an agent
    pub fn audio_path(&self, agent: AgentId) -> PathBuf {
        self.config.audio_dir.join(format!("{}.wav", agent.as_str()))
    }

    /// Speak `text` as `agent`. Returns once playback has finished or failed.
    pub async fn speak(&self, agent: AgentId, text: &str) {
        let spoken = strip_markup(text);
        if spoken.is_empty() {
            tracing::debug!(agent = %agent, "Nothing to speak");
            return;
        }

        let start = std::time::Instant::now();
        let audio = self.audio_path(agent);
        // Never replay the previous utterance if synthesis fails
        if let Err(e) = tokio::fs::remove_file(&audio).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %audio.display(), error = %e, "Could not clear old audio");
            }
        }

        if let Err(e) = self.synthesize(agent.voice(), &spoken, &audio).await {
            tracing::warn!(agent = %agent, error = %e, "Speech synthesis failed");
            return;
        }

        if !wait_for_stable_file(&audio, self.config.poll_interval, self.config.settle_timeout).await
        {
            tracing::warn!(agent = %agent, path = %audio.display(), "Audio file never settled");
            return;
        }

        if let Err(e) = self.play(&audio).await {
            tracing::warn!(agent = %agent, error = %e, "Audio playback failed");
            return;
        }

        tracing::debug!(
            agent = %agent,
            duration_ms = %start.elapsed().as_millis(),
            "Speech finished"
        );
    }

    async fn synthesize(&self, voice: Voice, text: &str, out: &Path) -> Result<(), String> {
        let mut parts = self.config.tts_command.split_whitespace();
        let program = parts.next().ok_or("empty TTS command")?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .arg("--text")
            .arg(text)
            .arg("--model_name")
            .arg(voice.model);
        if let Some(vocoder) = voice.vocoder {
            cmd.arg("--vocoder_name").arg(vocoder);
        }
        if let Some(speaker) = voice.speaker {
            cmd.arg("--speaker_idx").arg(speaker);
        }
        cmd.arg("--out_path").arg(out);

        run_quietly(cmd).await
    }

    async fn play(&self, audio: &Path) -> Result<(), String> {
        let mut parts = self.config.audio_player.split_whitespace();
        let program = parts.next().ok_or("empty audio player command")?;
        let mut cmd = Command::new(program);
        cmd.args(parts).arg(audio);
        run_quietly(cmd).await
    }
}

async fn run_quietly(mut cmd: Command) -> Result<(), String> {
    // The terminal belongs to the TUI
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let status = cmd.status().await.map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("exited with {status}"))
    }
}

/// Remove machine-directed syntax before synthesis
pub fn strip_markup(text: &str) -> String {
    let without_tools = directive::strip(text);
    CODE_FENCE.replace_all(&without_tools, "").trim().to_string()
}

/// Poll until `path` exists with a non-zero size that is unchanged across
/// two consecutive polls. Gives up after `timeout`.
pub async fn wait_for_stable_file(path: &Path, interval: Duration, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut last_size = None;
    loop {
        let size = tokio::fs::metadata(path).await.ok().map(|m| m.len());
        match (last_size, size) {
            (Some(prev), Some(now)) if prev == now && now > 0 => return true,
            _ => last_size = size,
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}
