//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::{LlmError, LlmService};
use crate::persona::{build_prompt, windowed, AgentId};
use crate::speech::SpeechSequencer;
use crate::store::Message;
use crate::tools::{Directive, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Produces an agent's next reply from the conversation so far
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, agent: AgentId, history: &[Message]) -> Result<String, LlmError>;
}

/// Runs one directive; the output text is recorded as its result
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, directive: &Directive) -> ToolOutput;
}

/// Speaks a reply; returns when speaking has finished or failed
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, agent: AgentId, text: &str);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    async fn generate(&self, agent: AgentId, history: &[Message]) -> Result<String, LlmError> {
        (**self).generate(agent, history).await
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, directive: &Directive) -> ToolOutput {
        (**self).execute(directive).await
    }
}

#[async_trait]
impl<T: Speaker + ?Sized> Speaker for Arc<T> {
    async fn speak(&self, agent: AgentId, text: &str) {
        (**self).speak(agent, text).await;
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Generation client that renders the persona prompt for an LLM service
pub struct PromptingClient {
    service: Arc<dyn LlmService>,
    history_window: Option<usize>,
}

impl PromptingClient {
    pub fn new(service: Arc<dyn LlmService>, history_window: Option<usize>) -> Self {
        Self {
            service,
            history_window,
        }
    }
}

#[async_trait]
impl GenerationClient for PromptingClient {
    async fn generate(&self, agent: AgentId, history: &[Message]) -> Result<String, LlmError> {
        let view = windowed(history, self.history_window);
        let prompt = build_prompt(agent, &view);
        tracing::debug!(
            agent = %agent,
            messages = view.len(),
            prompt_chars = prompt.len(),
            "Requesting reply"
        );
        self.service.generate(&prompt).await
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, directive: &Directive) -> ToolOutput {
        self.dispatch(directive).await
    }
}

#[async_trait]
impl Speaker for SpeechSequencer {
    async fn speak(&self, agent: AgentId, text: &str) {
        SpeechSequencer::speak(self, agent, text).await;
    }
}
