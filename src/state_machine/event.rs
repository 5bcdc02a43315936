//! Events that drive the dialogue

use crate::llm::LlmError;
use crate::persona::AgentId;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Process the scripted opening line; first event of every run
    Start,

    // Operator events
    UserSubmit {
        text: String,
    },
    Quit,

    // Completion events
    GenerationResult {
        agent: AgentId,
        result: Result<String, LlmError>,
    },
    ToolResult {
        cycle: u64,
        output: String,
    },
    SpeechDone {
        agent: AgentId,
        cycle: u64,
    },
}

impl Event {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::UserSubmit { .. } => "user_submit",
            Event::Quit => "quit",
            Event::GenerationResult { .. } => "generation_result",
            Event::ToolResult { .. } => "tool_result",
            Event::SpeechDone { .. } => "speech_done",
        }
    }
}
