//! Effects produced by state transitions

use crate::persona::AgentId;
use crate::store::Message;
use crate::tools::Directive;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the conversation history
    AppendMessage(Message),

    /// Write the memory blob to disk
    PersistMemory,

    /// Ask the generation client for `agent`'s next reply
    RequestGeneration { agent: AgentId },

    /// Speak a reply (spawns as background task)
    Speak {
        agent: AgentId,
        text: String,
        cycle: u64,
    },

    /// Run the directive found in a reply (spawns as background task)
    ExecuteTool { directive: Directive, cycle: u64 },

    /// Stop the event loop
    Stop,
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage(message)
    }

    pub fn request_generation(agent: AgentId) -> Self {
        Effect::RequestGeneration { agent }
    }

    pub fn speak(agent: AgentId, text: impl Into<String>, cycle: u64) -> Self {
        Effect::Speak {
            agent,
            text: text.into(),
            cycle,
        }
    }
}
