//! Dialogue runtime executor

use super::traits::{GenerationClient, Speaker, ToolExecutor};
use super::{DialogueHandle, UiEvent};
use crate::state_machine::{transition, DialogueContext, DialogueState, Effect, Event};
use crate::store::ConversationStore;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Generic dialogue runtime that can work with any generation, tool and speech implementations
pub struct DialogueRuntime<G, T, S>
where
    G: GenerationClient + 'static,
    T: ToolExecutor + 'static,
    S: Speaker + 'static,
{
    context: DialogueContext,
    state: DialogueState,
    store: ConversationStore,
    generator: Arc<G>,
    tools: Arc<T>,
    speaker: Arc<S>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<UiEvent>,
}

impl<G, T, S> DialogueRuntime<G, T, S>
where
    G: GenerationClient + 'static,
    T: ToolExecutor + 'static,
    S: Speaker + 'static,
{
    /// Build a runtime and the handle used to drive it
    pub fn new(
        context: DialogueContext,
        store: ConversationStore,
        generator: Arc<G>,
        tools: Arc<T>,
        speaker: Arc<S>,
    ) -> (Self, DialogueHandle) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (broadcast_tx, _) = broadcast::channel(256);
        let state = DialogueState::initial(context.opening_speaker);
        let handle = DialogueHandle {
            event_tx: event_tx.clone(),
            broadcast_tx: broadcast_tx.clone(),
        };
        let runtime = Self {
            context,
            state,
            store,
            generator,
            tools,
            speaker,
            event_rx,
            event_tx,
            broadcast_tx,
        };
        (runtime, handle)
    }

    /// Process the opening line, then events until a quit
    pub async fn run(mut self) {
        tracing::info!(turn = %self.state.turn, "Starting dialogue runtime");

        if self.process_event(Event::Start).is_continue() {
            while let Some(event) = self.event_rx.recv().await {
                if self.process_event(event).is_break() {
                    break;
                }
            }
        }

        tracing::info!(cycle = self.state.cycle, "Dialogue runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> ControlFlow<()> {
        let name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(event = name, state = %self.state.system, error = %e, "Event rejected");
                return ControlFlow::Continue(());
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::debug!(
                event = name,
                from = %old_state.system,
                to = %self.state.system,
                turn = %self.state.turn,
                cycle = self.state.cycle,
                "State transition"
            );
            let _ = self.broadcast_tx.send(UiEvent::StateChange { state: self.state });
        }

        for effect in result.effects {
            if self.execute_effect(effect).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn execute_effect(&mut self, effect: Effect) -> ControlFlow<()> {
        match effect {
            Effect::AppendMessage(message) => {
                let index = self.store.append(message.clone());
                let _ = self.broadcast_tx.send(UiEvent::Message { index, message });
            }

            Effect::PersistMemory => {
                if let Err(e) = self.store.save() {
                    tracing::error!(error = %e, "Failed to persist memory");
                }
            }

            Effect::RequestGeneration { agent } => {
                // Snapshot now so the reply appended above is included
                let history = self.store.history();
                let generator = self.generator.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(agent = %agent, messages = history.len(), "Making generation request (background)");
                    let result = generator.generate(agent, &history).await;
                    let _ = event_tx.send(Event::GenerationResult { agent, result }).await;
                });
            }

            Effect::Speak { agent, text, cycle } => {
                let speaker = self.speaker.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    speaker.speak(agent, &text).await;
                    let _ = event_tx.send(Event::SpeechDone { agent, cycle }).await;
                });
            }

            Effect::ExecuteTool { directive, cycle } => {
                let label = directive.label();
                tracing::info!(tool = %label, cycle, "Executing tool (background)");
                let _ = self.broadcast_tx.send(UiEvent::ToolStarted {
                    label: label.clone(),
                });

                let tools = self.tools.clone();
                let event_tx = self.event_tx.clone();
                let broadcast_tx = self.broadcast_tx.clone();

                tokio::spawn(async move {
                    let result = tools.execute(&directive).await;
                    let _ = broadcast_tx.send(UiEvent::ToolFinished {
                        label,
                        success: result.success,
                        output: result.output.clone(),
                    });
                    let _ = event_tx
                        .send(Event::ToolResult {
                            cycle,
                            output: result.output,
                        })
                        .await;
                });
            }

            Effect::Stop => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }
}
