//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{DialogueHandle, DialogueRuntime, UiEvent};
use crate::llm::LlmError;
use crate::persona::{seed_history, AgentId};
use crate::state_machine::{DialogueContext, Event, PersistPolicy};
use crate::store::{ConversationStore, Message};
use crate::tools::{Directive, ToolOutput};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Generation Client
// ============================================================================

/// Mock generation client that returns queued replies.
///
/// With nothing queued a request never completes, which leaves the
/// dialogue parked in `Thinking`.
#[derive(Default)]
pub struct MockGenerationClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    /// Record of all requests made: agent and the history it was given
    pub requests: Mutex<Vec<(AgentId, Vec<Message>)>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue an error reply
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Agents for which a reply was requested, in order
    pub fn requested_agents(&self) -> Vec<AgentId> {
        self.requests.lock().unwrap().iter().map(|(a, _)| *a).collect()
    }

    /// History passed with the n-th request
    pub fn history_for(&self, n: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[n].1.clone()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, agent: AgentId, history: &[Message]) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap()
            .push((agent, history.to_vec()));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Mock tool executor with a fixed output and optional delay
pub struct MockToolExecutor {
    output: ToolOutput,
    delay: Duration,
    /// Record of tool executions
    pub executions: Mutex<Vec<Directive>>,
}

impl MockToolExecutor {
    pub fn new(output: impl Into<String>) -> Self {
        Self::with_output(ToolOutput::success(output))
    }

    /// Every execution reports failure with `output`
    pub fn failing(output: impl Into<String>) -> Self {
        Self::with_output(ToolOutput::error(output))
    }

    fn with_output(output: ToolOutput) -> Self {
        Self {
            output,
            delay: Duration::ZERO,
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn recorded_executions(&self) -> Vec<Directive> {
        self.executions.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new("mock tool output")
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, directive: &Directive) -> ToolOutput {
        self.executions.lock().unwrap().push(directive.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.output.clone()
    }
}

// ============================================================================
// Recording Speaker
// ============================================================================

/// Speaker that records what it was asked to say
#[derive(Default)]
pub struct RecordingSpeaker {
    delay: Duration,
    pub spoken: Mutex<Vec<(AgentId, String)>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn recorded(&self) -> Vec<(AgentId, String)> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, agent: AgentId, text: &str) {
        self.spoken.lock().unwrap().push((agent, text.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

pub struct TestRuntime {
    pub store: ConversationStore,
    pub handle: DialogueHandle,
    pub broadcast_rx: broadcast::Receiver<UiEvent>,
    pub generator: Arc<MockGenerationClient>,
    pub tools: Arc<MockToolExecutor>,
    pub speaker: Arc<RecordingSpeaker>,
    pub runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestRuntime {
    /// Create a test runtime with instant mocks
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder::default()
    }

    pub async fn send_message(&self, text: &str) {
        assert!(
            self.handle
                .send(Event::UserSubmit {
                    text: text.to_string(),
                })
                .await,
            "runtime stopped"
        );
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store.history()
    }

    /// Wait until at least `n` generation requests have been made
    pub async fn wait_for_requests(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.generator.requests.lock().unwrap().len() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    /// Wait until history holds at least `n` messages
    pub async fn wait_for_messages(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.store.len() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

#[derive(Default)]
pub struct TestRuntimeBuilder {
    generator: Option<MockGenerationClient>,
    tools: Option<MockToolExecutor>,
    speaker: Option<RecordingSpeaker>,
    store: Option<ConversationStore>,
    policy: PersistPolicy,
}

impl TestRuntimeBuilder {
    pub fn generator(mut self, generator: MockGenerationClient) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn tools(mut self, tools: MockToolExecutor) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn speaker(mut self, speaker: RecordingSpeaker) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn store(mut self, store: ConversationStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn policy(mut self, policy: PersistPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> TestRuntime {
        let store = self.store.unwrap_or_else(ConversationStore::in_memory);
        store.seed(seed_history());
        let generator = Arc::new(self.generator.unwrap_or_default());
        let tools = Arc::new(self.tools.unwrap_or_default());
        let speaker = Arc::new(self.speaker.unwrap_or_default());

        let (runtime, handle) = DialogueRuntime::new(
            DialogueContext::new(self.policy),
            store.clone(),
            generator.clone(),
            tools.clone(),
            speaker.clone(),
        );
        let broadcast_rx = handle.subscribe();
        let runtime_handle = tokio::spawn(runtime.run());

        TestRuntime {
            store,
            handle,
            broadcast_rx,
            generator,
            tools,
            speaker,
            runtime_handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{OPENING_LINE, MISSION_MESSAGE};
    use crate::state_machine::SystemState;
    use crate::store::Role;
    use crate::tools::{ToolCall, ToolKind};
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mock_generation_client() {
        let mock = MockGenerationClient::new();
        mock.queue_reply("Hello");

        let reply = mock.generate(AgentId::Ether, &[]).await.unwrap();
        assert_eq!(reply, "Hello");
        assert_eq!(mock.requested_agents(), vec![AgentId::Ether]);

        // Nothing queued: the request stays outstanding
        let pending =
            tokio::time::timeout(Duration::from_millis(20), mock.generate(AgentId::Aurora, &[]))
                .await;
        assert!(pending.is_err());
    }

    /// The opening line is spoken, its search runs, and Aurora answers
    #[tokio::test]
    async fn test_opening_line_runs_its_tool() {
        let rt = TestRuntime::builder()
            .tools(MockToolExecutor::new("polymorphism facts"))
            .build();

        assert!(rt.wait_for_requests(1, WAIT).await);
        assert_eq!(rt.generator.requested_agents(), vec![AgentId::Aurora]);
        assert_eq!(
            rt.tools.recorded_executions(),
            vec![Directive::Call(ToolCall::new(
                ToolKind::Search,
                "principles of polymorphic code generation"
            ))]
        );

        let history = rt.generator.history_for(0);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, MISSION_MESSAGE);
        assert_eq!(history[1].content, OPENING_LINE);
        assert_eq!(history[2].content, "[TOOL_RESULT] polymorphism facts");
    }

    /// Plain reply: spoken once, then the other agent is asked
    #[tokio::test]
    async fn test_plain_reply_cycle() {
        let generator = MockGenerationClient::new();
        generator.queue_reply("A plain reply.");

        let rt = TestRuntime::builder().generator(generator).build();
        assert!(rt.wait_for_requests(2, WAIT).await);

        assert_eq!(
            rt.generator.requested_agents(),
            vec![AgentId::Aurora, AgentId::Ether]
        );
        let spoken = rt.speaker.recorded();
        assert!(spoken.contains(&(AgentId::Aurora, "A plain reply.".to_string())));
        assert_eq!(
            spoken.iter().filter(|(a, _)| *a == AgentId::Aurora).count(),
            1
        );
        // Ether sees Aurora's reply
        let history = rt.generator.history_for(1);
        assert_eq!(history.last().unwrap(), &Message::agent(AgentId::Aurora, "A plain reply."));
    }

    /// Tool reply: dispatcher gets the parsed call, result is recorded, turn flips once
    #[tokio::test]
    async fn test_tool_reply_cycle() {
        let generator = MockGenerationClient::new();
        generator.queue_reply("Let me check. [TOOL:SEARCH:quantum foam]");

        let rt = TestRuntime::builder()
            .generator(generator)
            .tools(MockToolExecutor::new("No specific result found, please broaden the query."))
            .build();
        assert!(rt.wait_for_requests(2, WAIT).await);

        assert_eq!(
            rt.generator.requested_agents(),
            vec![AgentId::Aurora, AgentId::Ether]
        );
        let executions = rt.tools.recorded_executions();
        assert_eq!(
            executions[1],
            Directive::Call(ToolCall::new(ToolKind::Search, "quantum foam"))
        );
        let history = rt.generator.history_for(1);
        assert_eq!(
            history.last().unwrap().content,
            "[TOOL_RESULT] No specific result found, please broaden the query."
        );
    }

    /// Speech finishing long after the tool result never flips the turn again
    #[tokio::test]
    async fn test_slow_speech_does_not_double_flip() {
        let generator = MockGenerationClient::new();
        generator.queue_reply("[TOOL:EXECUTE:ls]");
        generator.queue_reply("Ether here.");

        let rt = TestRuntime::builder()
            .generator(generator)
            .speaker(RecordingSpeaker::new().with_delay(Duration::from_millis(100)))
            .build();

        assert!(rt.wait_for_requests(3, WAIT).await);
        // Let every outstanding speech finish
        tokio::time::sleep(Duration::from_millis(400)).await;

        let agents = rt.generator.requested_agents();
        for pair in agents.windows(2) {
            assert_ne!(pair[0], pair[1], "turn repeated: {agents:?}");
        }
        assert_eq!(&agents[..3], &[AgentId::Aurora, AgentId::Ether, AgentId::Aurora]);
    }

    /// With a slow tool, the finished speech must not advance the turn
    #[tokio::test]
    async fn test_speech_before_slow_tool_waits_for_tool() {
        let rt = TestRuntime::builder()
            .tools(MockToolExecutor::default().with_delay(Duration::from_millis(150)))
            .build();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rt.speaker.recorded().len(), 1);
        assert!(rt.generator.requested_agents().is_empty());

        assert!(rt.wait_for_requests(1, WAIT).await);
        assert_eq!(rt.generator.requested_agents(), vec![AgentId::Aurora]);
    }

    /// Generation failure: error appended, nothing spoken or run, turn kept
    #[tokio::test]
    async fn test_generation_error_stalls_until_user_input() {
        let generator = MockGenerationClient::new();
        generator.queue_error(LlmError::connection("Connection failed: refused"));

        let rt = TestRuntime::builder().generator(generator).build();
        // mission, opening, tool result, error
        assert!(rt.wait_for_messages(4, WAIT).await);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let history = rt.messages();
        let last = history.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.content.contains("Connection failed: refused"));
        assert_eq!(rt.generator.requested_agents(), vec![AgentId::Aurora]);
        assert_eq!(rt.speaker.recorded().len(), 1); // only the opening line
        assert_eq!(rt.tools.recorded_executions().len(), 1);

        // A nudge retries for the same agent
        rt.send_message("try again").await;
        assert!(rt.wait_for_requests(2, WAIT).await);
        assert_eq!(
            rt.generator.requested_agents(),
            vec![AgentId::Aurora, AgentId::Aurora]
        );
        assert_eq!(rt.generator.history_for(1).last().unwrap(), &Message::user("try again"));
    }

    /// User input is appended and written to disk
    #[tokio::test]
    async fn test_user_submit_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memory.json");
        let rt = TestRuntime::builder()
            .store(ConversationStore::open(&path))
            .policy(PersistPolicy::UserInput)
            .build();
        assert!(rt.wait_for_requests(1, WAIT).await);

        rt.send_message("hello").await;
        assert!(rt.wait_for_requests(2, WAIT).await);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let transcript = raw["transcript"].as_array().unwrap();
        assert_eq!(transcript.last().unwrap()["content"], "hello");
        assert_eq!(transcript.last().unwrap()["role"], "user");
    }

    /// State changes are broadcast for the status line
    #[tokio::test]
    async fn test_state_changes_broadcast() {
        let mut rt = TestRuntime::builder().build();
        let mut saw_executing = false;
        let mut saw_thinking = false;
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline && !(saw_executing && saw_thinking) {
            if let Ok(Ok(UiEvent::StateChange { state })) =
                tokio::time::timeout(Duration::from_millis(50), rt.broadcast_rx.recv()).await
            {
                saw_executing |= state.system == SystemState::ExecutingTool;
                saw_thinking |= state.system == SystemState::Thinking;
            }
        }
        assert!(saw_executing && saw_thinking);
    }

    /// Tool failures reach the terminal surface as failures
    #[tokio::test]
    async fn test_tool_failure_flag_broadcast() {
        let mut rt = TestRuntime::builder()
            .tools(MockToolExecutor::failing("Search failed: timed out"))
            .build();
        let deadline = tokio::time::Instant::now() + WAIT;
        let mut finished = None;
        while finished.is_none() && tokio::time::Instant::now() < deadline {
            if let Ok(Ok(UiEvent::ToolFinished { success, output, .. })) =
                tokio::time::timeout(Duration::from_millis(50), rt.broadcast_rx.recv()).await
            {
                finished = Some((success, output));
            }
        }
        assert_eq!(finished, Some((false, "Search failed: timed out".to_string())));

        // The failure text is still recorded as the tool result
        assert!(rt.wait_for_requests(1, WAIT).await);
        assert_eq!(
            rt.generator.history_for(0).last().unwrap().content,
            "[TOOL_RESULT] Search failed: timed out"
        );
    }

    #[tokio::test]
    async fn test_quit_stops_runtime() {
        let rt = TestRuntime::builder().build();
        assert!(rt.handle.send(Event::Quit).await);
        tokio::time::timeout(WAIT, rt.runtime_handle)
            .await
            .expect("runtime did not stop")
            .unwrap();
    }
}
