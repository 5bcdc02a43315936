//! Terminal application model
//!
//! Holds what the view draws and turns key presses into actions. Never
//! touches the dialogue state directly; it only mirrors runtime updates.

use crate::runtime::UiEvent;
use crate::state_machine::DialogueState;
use crate::store::Message;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks the caller to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Submit(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolActivity {
    Started,
    Finished { success: bool, output: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLogEntry {
    pub label: String,
    pub activity: ToolActivity,
}

pub struct App {
    pub conversation: Vec<Message>,
    pub tool_log: Vec<ToolLogEntry>,
    pub state: DialogueState,
    pub input: String,
    /// Conversation scroll offset; `None` follows the newest message
    pub conversation_scroll: Option<u16>,
    /// Set by the view on every draw
    pub viewport_height: u16,
}

impl App {
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            conversation: history,
            tool_log: Vec::new(),
            state: DialogueState::default(),
            input: String::new(),
            conversation_scroll: None,
            viewport_height: 0,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Esc => Action::Quit,
            KeyCode::Enter => {
                let text = self.input.trim().to_string();
                if text.is_empty() {
                    return Action::None;
                }
                self.input.clear();
                Action::Submit(text)
            }
            KeyCode::Backspace => {
                self.input.pop();
                Action::None
            }
            KeyCode::PageUp => {
                let page = self.viewport_height.max(1);
                // The view clamps a following offset to the bottom on the next draw
                let current = self.conversation_scroll.unwrap_or(u16::MAX);
                self.conversation_scroll = Some(current.saturating_sub(page));
                Action::None
            }
            KeyCode::PageDown => {
                if let Some(offset) = self.conversation_scroll {
                    self.conversation_scroll =
                        Some(offset.saturating_add(self.viewport_height.max(1)));
                }
                Action::None
            }
            KeyCode::End => {
                self.conversation_scroll = None;
                Action::None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            // Already shown when it was part of a history snapshot
            UiEvent::Message { index, message } => {
                if index >= self.conversation.len() {
                    self.conversation.push(message);
                }
            }
            UiEvent::StateChange { state } => self.state = state,
            UiEvent::ToolStarted { label } => self.tool_log.push(ToolLogEntry {
                label,
                activity: ToolActivity::Started,
            }),
            UiEvent::ToolFinished {
                label,
                success,
                output,
            } => self.tool_log.push(ToolLogEntry {
                label,
                activity: ToolActivity::Finished { success, output },
            }),
        }
    }

    /// Replace the mirrored history after missed updates
    pub fn resync(&mut self, history: Vec<Message>) {
        self.conversation = history;
    }

    pub fn status_line(&self) -> String {
        format!("State: {} | Turn: {}", self.state.system, self.state.turn)
    }
}
