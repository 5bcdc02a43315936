//! Terminal surface
//!
//! Draws the mission banner, the dialogue, tool activity, the controller
//! state and an input line. Key presses become dialogue events; runtime
//! updates arrive over the broadcast channel.

mod app;
mod theme;
mod view;

use app::{Action, App};
pub use theme::Theme;

use crate::runtime::{DialogueHandle, UiEvent};
use crate::state_machine::Event;
use crate::store::ConversationStore;
use crossterm::event::{Event as TermEvent, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use tokio::sync::broadcast::{self, error::RecvError};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the terminal until the operator quits or the dialogue stops.
///
/// `updates` should be subscribed before the runtime starts so no early
/// message is missed.
pub async fn run(
    handle: &DialogueHandle,
    updates: broadcast::Receiver<UiEvent>,
    store: &ConversationStore,
    theme: Theme,
) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, handle, updates, store, &theme).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

async fn event_loop(
    terminal: &mut Term,
    handle: &DialogueHandle,
    mut updates: broadcast::Receiver<UiEvent>,
    store: &ConversationStore,
    theme: &Theme,
) -> io::Result<()> {
    let mut app = App::new(store.history());
    let mut keys = EventStream::new();

    loop {
        terminal.draw(|f| view::draw(f, &mut app, theme))?;

        tokio::select! {
            term_event = keys.next() => match term_event {
                Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.handle_key(key) {
                        Action::Submit(text) => {
                            tracing::info!(chars = text.len(), "Operator input");
                            if !handle.send(Event::UserSubmit { text }).await {
                                break;
                            }
                        }
                        Action::Quit => {
                            handle.send(Event::Quit).await;
                            break;
                        }
                        Action::None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            },

            update = updates.recv() => match update {
                Ok(event) => app.apply(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "UI fell behind; resyncing history");
                    app.resync(store.history());
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
