//! Pure state transition function

use super::{DialogueContext, DialogueState, Effect, Event, SystemState};
use crate::llm::LlmError;
use crate::persona::AgentId;
use crate::store::Message;
use crate::tools::Directive;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: DialogueState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: DialogueState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Empty input ignored")]
    EmptyInput,
    #[error("Dialogue already started")]
    AlreadyStarted,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &DialogueState,
    context: &DialogueContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state.system, event) {
        (_, Event::Quit) => Ok(TransitionResult::new(*state).with_effect(Effect::Stop)),

        // ============================================================
        // Opening line
        // ============================================================
        (SystemState::Speaking, Event::Start) if state.is_unstarted() => {
            // Already in history; only speak it and run its directive
            Ok(handle_reply(
                state,
                context,
                context.opening_speaker,
                &context.opening_line,
                false,
            ))
        }

        (_, Event::Start) => Err(TransitionError::AlreadyStarted),

        // ============================================================
        // Operator input
        // ============================================================
        (_, Event::UserSubmit { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            let new_state = DialogueState {
                system: SystemState::Thinking,
                ..*state
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::user(text)))
                .with_effect(Effect::PersistMemory)
                .with_effect(Effect::request_generation(state.turn)))
        }

        // ============================================================
        // Generation results
        // ============================================================
        (SystemState::Thinking, Event::GenerationResult { agent, result }) => {
            if agent != state.turn {
                return Err(TransitionError::InvalidTransition(format!(
                    "generation result for {agent} while it is {}'s turn",
                    state.turn
                )));
            }
            match result {
                Ok(text) => Ok(handle_reply(state, context, agent, &text, true)),
                Err(error) => Ok(handle_generation_error(state, context, &error)),
            }
        }

        (system, Event::GenerationResult { agent, .. }) => {
            Err(TransitionError::InvalidTransition(format!(
                "generation result for {agent} in {system}"
            )))
        }

        // ============================================================
        // Tool results
        // ============================================================
        (SystemState::ExecutingTool, Event::ToolResult { cycle, output })
            if cycle == state.cycle =>
        {
            let next = state.turn.other();
            let new_state = DialogueState {
                system: SystemState::Thinking,
                turn: next,
                cycle: state.cycle,
            };
            Ok(TransitionResult::new(new_state)
                .with_effects(append_effects(context, Message::tool_result(&output)))
                .with_effect(Effect::request_generation(next)))
        }

        // Stale results still belong in history, but never advance the turn
        (_, Event::ToolResult { output, .. }) => Ok(TransitionResult::new(*state)
            .with_effects(append_effects(context, Message::tool_result(&output)))),

        // ============================================================
        // Speech completion
        // ============================================================
        (SystemState::Speaking, Event::SpeechDone { agent, cycle })
            if cycle == state.cycle && agent == state.turn =>
        {
            let next = state.turn.other();
            let new_state = DialogueState {
                system: SystemState::Thinking,
                turn: next,
                cycle: state.cycle,
            };
            Ok(TransitionResult::new(new_state).with_effect(Effect::request_generation(next)))
        }

        // Speech alongside a tool, or for an earlier cycle: nothing to do
        (_, Event::SpeechDone { .. }) => Ok(TransitionResult::new(*state)),
    }
}

/// Route a reply: speak it, and run its directive if one is present.
///
/// The tool path wins for turn advancement whenever a directive (even a
/// malformed one) is present.
fn handle_reply(
    state: &DialogueState,
    context: &DialogueContext,
    agent: AgentId,
    text: &str,
    append: bool,
) -> TransitionResult {
    let cycle = state.cycle + 1;
    let directive = Directive::parse(text);
    let system = if directive.is_present() {
        SystemState::ExecutingTool
    } else {
        SystemState::Speaking
    };
    let new_state = DialogueState {
        system,
        turn: agent,
        cycle,
    };

    let mut result = TransitionResult::new(new_state);
    if append {
        result = result.with_effects(append_effects(context, Message::agent(agent, text)));
    }
    result = result.with_effect(Effect::speak(agent, text, cycle));
    if directive.is_present() {
        result = result.with_effect(Effect::ExecuteTool { directive, cycle });
    }
    result
}

fn handle_generation_error(
    state: &DialogueState,
    context: &DialogueContext,
    error: &LlmError,
) -> TransitionResult {
    let message = Message::system(format!("Error ({}): {}", error.kind.label(), error.message));
    TransitionResult::new(*state).with_effects(append_effects(context, message))
}

fn append_effects(context: &DialogueContext, message: Message) -> Vec<Effect> {
    let mut effects = vec![Effect::append(message)];
    if context.persists_every_message() {
        effects.push(Effect::PersistMemory);
    }
    effects
}
