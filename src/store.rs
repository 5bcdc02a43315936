//! Conversation store
//!
//! Holds the ordered message history and the persisted memory blob.
//! Every read and write goes through one exclusive lock; the memory file
//! is replaced atomically so a crash mid-save leaves the previous snapshot.

use crate::persona::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Prefix marking a system message that carries a tool result
pub const TOOL_RESULT_TAG: &str = "[TOOL_RESULT]";

/// Memory key holding the transcript snapshot
pub const TRANSCRIPT_KEY: &str = "transcript";
/// Memory key holding the time of the last save
pub const SAVED_AT_KEY: &str = "saved_at";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read memory file: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to write memory file: {0}")]
    Write(#[source] std::io::Error),
    #[error("Memory file is not a JSON object: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    User,
    System,
    Agent(AgentId),
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::System => "system",
            Role::Agent(agent) => agent.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "system" => Ok(Role::System),
            other => AgentId::parse(other)
                .map(Role::Agent)
                .ok_or_else(|| format!("unknown role: {other}")),
        }
    }
}

/// A single history entry. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn agent(agent: AgentId, content: impl Into<String>) -> Self {
        Self::new(Role::Agent(agent), content)
    }

    pub fn tool_result(output: &str) -> Self {
        Self::system(format!("{TOOL_RESULT_TAG} {output}"))
    }

    pub fn is_tool_result(&self) -> bool {
        self.role == Role::System && self.content.starts_with(TOOL_RESULT_TAG)
    }
}

struct Inner {
    history: Vec<Message>,
    memory: Map<String, Value>,
}

/// Thread-safe handle to history and memory
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Mutex<Inner>>,
    path: Option<PathBuf>,
}

impl ConversationStore {
    /// Open a store backed by `path`, loading any existing memory.
    ///
    /// A missing file starts from an empty mapping. An unreadable or
    /// corrupt file is logged and also starts empty; the next save
    /// replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            inner: Arc::new(Mutex::new(Inner {
                history: Vec::new(),
                memory: Map::new(),
            })),
            path: Some(path.into()),
        };
        if let Err(e) = store.load() {
            tracing::warn!(error = %e, "Starting with empty memory");
        }
        store
    }

    /// A store with no backing file (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                history: Vec::new(),
                memory: Map::new(),
            })),
            path: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload the memory mapping from disk, replacing the in-memory one
    pub fn load(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut inner = self.lock();
        let data = match std::fs::read(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No memory file yet");
                inner.memory = Map::new();
                return Ok(());
            }
            Err(e) => {
                inner.memory = Map::new();
                return Err(StoreError::Read(e));
            }
        };
        match serde_json::from_slice::<Map<String, Value>>(&data) {
            Ok(memory) => {
                tracing::info!(path = %path.display(), keys = memory.len(), "Loaded memory");
                inner.memory = memory;
                Ok(())
            }
            Err(e) => {
                inner.memory = Map::new();
                Err(StoreError::Decode(e))
            }
        }
    }

    /// Write the memory mapping, with a fresh transcript snapshot.
    ///
    /// The file is written to a sibling temp file and renamed over the
    /// target, so readers only ever see a complete snapshot.
    pub fn save(&self) -> StoreResult<()> {
        let mut inner = self.lock();
        let transcript = serde_json::to_value(&inner.history)?;
        inner.memory.insert(TRANSCRIPT_KEY.to_string(), transcript);
        inner.memory.insert(
            SAVED_AT_KEY.to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );

        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = serde_json::to_vec_pretty(&inner.memory)?;
        write_atomically(path, &data).map_err(StoreError::Write)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Saved memory");
        Ok(())
    }

    /// Seed the history; only valid before anything has been appended
    pub fn seed(&self, messages: impl IntoIterator<Item = Message>) {
        let mut inner = self.lock();
        debug_assert!(inner.history.is_empty(), "seeding a non-empty history");
        inner.history.extend(messages);
    }

    /// Append and return the message's position in history
    pub fn append(&self, message: Message) -> usize {
        let mut inner = self.lock();
        inner.history.push(message);
        inner.history.len() - 1
    }

    /// Snapshot of the full history, in order
    pub fn history(&self) -> Vec<Message> {
        self.lock().history.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().history.len()
    }

    /// Snapshot of the memory mapping
    #[allow(dead_code)] // Used in tests
    pub fn memory(&self) -> Map<String, Value> {
        self.lock().memory.clone()
    }

    #[allow(dead_code)] // Used in tests
    pub fn remember(&self, key: impl Into<String>, value: Value) {
        self.lock().memory.insert(key.into(), value);
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
