//! Skyscope Sentinel - two agents in spoken dialogue
//!
//! Two local-model personas take turns talking about a shared mission,
//! invoking tools through directives embedded in their replies. The
//! operator watches in the terminal and can interject at any time.

mod config;
mod llm;
mod persona;
mod runtime;
mod speech;
mod state_machine;
mod store;
mod tools;
mod tui;

use config::Config;
use llm::{LlmService, LoggingService, OllamaService};
use runtime::{DialogueRuntime, PromptingClient};
use speech::SpeechSequencer;
use state_machine::{DialogueContext, Event};
use std::fs::OpenOptions;
use std::sync::Arc;
use store::ConversationStore;
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // The terminal belongs to the TUI, so logs go to a file
    let log_file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", config.log_file.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("SENTINEL_LOG")
                .unwrap_or_else(|_| "skyscope_sentinel=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    tracing::info!(
        model = %config.model,
        url = %config.ollama_url,
        working_dir = %config.working_dir.display(),
        "Starting dialogue"
    );
    if config.allow_execute {
        tracing::warn!("Execute tool is enabled; agents can run local programs");
    }

    // Conversation store, seeded with the mission and the opening line
    let store = ConversationStore::open(config.memory_file.clone());
    store.seed(persona::seed_history());

    let service: Arc<dyn LlmService> = Arc::new(OllamaService::new(config.ollama_config())?);
    let generator = Arc::new(PromptingClient::new(
        Arc::new(LoggingService::new(service)),
        config.history_window,
    ));
    let tools = Arc::new(ToolRegistry::new(config.tool_context()));
    let speaker = Arc::new(SpeechSequencer::new(config.speech_config()));

    let (runtime, handle) = DialogueRuntime::new(
        DialogueContext::new(config.persist),
        store.clone(),
        generator,
        tools,
        speaker,
    );
    let updates = handle.subscribe();
    let runtime_task = tokio::spawn(runtime.run());

    let ui_result = tui::run(&handle, updates, &store, tui::Theme::default()).await;

    handle.send(Event::Quit).await;
    if let Err(e) = runtime_task.await {
        tracing::error!(error = %e, "Dialogue task ended abnormally");
    }
    if let Err(e) = store.save() {
        tracing::error!(error = %e, "Failed to save memory on exit");
    }
    tracing::info!(messages = store.len(), "Dialogue ended");

    ui_result?;
    Ok(())
}
