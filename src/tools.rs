//! Tool dispatcher
//!
//! Executes the single directive found in a reply. Tools never fail from
//! the caller's point of view: every error is folded into the returned
//! text so the conversation always records what was attempted.

pub mod directive;
mod execute;
mod files;
mod search;

pub use directive::{Directive, Malformed, ToolCall, ToolKind};
pub use execute::ExecuteTool;
pub use files::{ReadFileTool, WriteFileTool};
pub use search::SearchTool;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Result text for a well-formed directive naming no known tool
pub fn unknown_tool_text(name: &str) -> String {
    format!("Unknown tool: {name}")
}

/// Result text for directive syntax that could not be parsed
pub const INVALID_FORMAT_TEXT: &str = "Invalid tool format.";

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Whether the Execute tool may spawn processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPolicy {
    #[default]
    Enabled,
    Disabled,
}

/// Everything a tool needs at run time.
///
/// Built once from configuration and shared by every invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Relative file paths and spawned commands resolve against this
    pub working_dir: PathBuf,
    pub http: reqwest::Client,
    pub search_url: String,
    /// Upper bound on one search request
    pub request_timeout: Duration,
    pub command_timeout: Duration,
    pub execution: ExecutionPolicy,
}

impl ToolContext {
    pub fn new(working_dir: PathBuf, search_url: impl Into<String>) -> Self {
        Self {
            working_dir,
            http: reqwest::Client::new(),
            search_url: search_url.into(),
            request_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            execution: ExecutionPolicy::Enabled,
        }
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_execution(mut self, policy: ExecutionPolicy) -> Self {
        self.execution = policy;
        self
    }

    /// Resolve a tool-supplied path against the working directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// A single tool reachable through a directive
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Run with the raw directive argument
    async fn run(&self, argument: &str, ctx: &ToolContext) -> ToolOutput;
}

/// The fixed tool set, keyed by kind
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(SearchTool),
            Arc::new(ReadFileTool),
            Arc::new(WriteFileTool),
            Arc::new(ExecuteTool),
        ];
        Self { tools, ctx }
    }

    /// Execute a directive and return the result to record.
    ///
    /// Malformed directives still produce a result so history reflects the
    /// attempt. [`Directive::None`] is never dispatched by the runtime but
    /// is answered the same way.
    pub async fn dispatch(&self, directive: &Directive) -> ToolOutput {
        let call = match directive {
            Directive::Call(call) => call,
            Directive::Malformed(Malformed::UnknownTool { name }) => {
                tracing::warn!(tool = %name, "Unknown tool requested");
                return ToolOutput::error(unknown_tool_text(name));
            }
            Directive::Malformed(Malformed::InvalidSyntax) | Directive::None => {
                tracing::warn!("Invalid tool directive");
                return ToolOutput::error(INVALID_FORMAT_TEXT);
            }
        };

        let Some(tool) = self.tools.iter().find(|t| t.kind() == call.kind) else {
            return ToolOutput::error(unknown_tool_text(call.kind.name()));
        };

        let start = std::time::Instant::now();
        let output = tool.run(&call.argument, &self.ctx).await;
        if output.success {
            tracing::info!(
                tool = %call.kind,
                duration_ms = %start.elapsed().as_millis(),
                "Tool completed"
            );
        } else {
            tracing::warn!(
                tool = %call.kind,
                duration_ms = %start.elapsed().as_millis(),
                output = %output.output,
                "Tool reported failure"
            );
        }
        output
    }
}
