//! Dialogue state types

use crate::persona::{AgentId, OPENING_LINE, OPENING_SPEAKER};
use std::fmt;

/// What the previous actor is doing, gating which event is expected next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemState {
    /// A generation request is outstanding
    Thinking,
    /// A reply without a tool directive is being spoken
    Speaking,
    /// A reply with a tool directive is being spoken and its tool run
    ExecutingTool,
}

impl SystemState {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemState::Thinking => "THINKING",
            SystemState::Speaking => "SPEAKING",
            SystemState::ExecutingTool => "EXECUTING_TOOL",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full controller state, owned by the runtime loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueState {
    pub system: SystemState,
    /// Agent owning the next reply
    pub turn: AgentId,
    /// Reply cycle number. Incremented for every reply that gets spoken,
    /// completions carry it back so stale ones can be told apart.
    pub cycle: u64,
}

impl DialogueState {
    /// The opening line is "being spoken" before any model call
    pub fn initial(opening_speaker: AgentId) -> Self {
        Self {
            system: SystemState::Speaking,
            turn: opening_speaker,
            cycle: 0,
        }
    }

    /// True until the opening line has been processed
    pub fn is_unstarted(&self) -> bool {
        self.cycle == 0
    }
}

impl Default for DialogueState {
    fn default() -> Self {
        Self::initial(OPENING_SPEAKER)
    }
}

/// When the memory blob is written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// After every appended message
    #[default]
    EveryMessage,
    /// Only when the operator submits input
    UserInput,
}

impl PersistPolicy {
    pub fn parse(s: &str) -> Option<PersistPolicy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "every_message" => Some(PersistPolicy::EveryMessage),
            "user_input" => Some(PersistPolicy::UserInput),
            _ => None,
        }
    }
}

/// Fixed inputs to every transition
#[derive(Debug, Clone)]
pub struct DialogueContext {
    pub opening_speaker: AgentId,
    pub opening_line: String,
    pub persist_policy: PersistPolicy,
}

impl DialogueContext {
    pub fn new(persist_policy: PersistPolicy) -> Self {
        Self {
            opening_speaker: OPENING_SPEAKER,
            opening_line: OPENING_LINE.to_string(),
            persist_policy,
        }
    }

    pub fn persists_every_message(&self) -> bool {
        self.persist_policy == PersistPolicy::EveryMessage
    }
}

impl Default for DialogueContext {
    fn default() -> Self {
        Self::new(PersistPolicy::default())
    }
}
