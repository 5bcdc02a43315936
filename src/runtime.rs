//! Runtime for the dialogue
//!
//! Owns the controller state on a single task, feeds it events in arrival
//! order and carries out the effects it returns. Generation, tool and
//! speech work is spawned and reports back with exactly one event.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::DialogueRuntime;
pub use traits::*;

use crate::state_machine::{DialogueState, Event};
use crate::store::Message;
use tokio::sync::{broadcast, mpsc};

/// Updates for the terminal surface
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// `index` is the message's position in history
    Message { index: usize, message: Message },
    StateChange { state: DialogueState },
    ToolStarted { label: String },
    ToolFinished {
        label: String,
        success: bool,
        output: String,
    },
}

/// Handle for talking to a running dialogue
#[derive(Clone)]
pub struct DialogueHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<UiEvent>,
}

impl DialogueHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Queue an event; false once the runtime has stopped
    pub async fn send(&self, event: Event) -> bool {
        self.event_tx.send(event).await.is_ok()
    }
}
