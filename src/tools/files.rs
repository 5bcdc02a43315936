//! File tools - read and write local files
//!
//! Paths are resolved against the tool working directory. Failures are
//! reported in the output text, never as errors.

use super::{Tool, ToolContext, ToolKind, ToolOutput};
use async_trait::async_trait;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    async fn run(&self, argument: &str, ctx: &ToolContext) -> ToolOutput {
        let path = argument.trim();
        match tokio::fs::read_to_string(ctx.resolve(path)).await {
            Ok(content) => ToolOutput::success(content),
            Err(e) => ToolOutput::error(format!("Error reading file '{path}': {e}")),
        }
    }
}

pub struct WriteFileTool;

impl WriteFileTool {
    pub const USAGE_ERROR: &'static str =
        "Invalid WRITEFILE format. Use [TOOL:WRITEFILE:path,content]";

    /// Split `path,content` on the first comma and unescape `\n` in content
    fn parse(argument: &str) -> Option<(&str, String)> {
        let (path, content) = argument.split_once(',')?;
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        Some((path, content.replace("\\n", "\n")))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WriteFile
    }

    async fn run(&self, argument: &str, ctx: &ToolContext) -> ToolOutput {
        let Some((path, content)) = Self::parse(argument) else {
            return ToolOutput::error(Self::USAGE_ERROR);
        };
        match tokio::fs::write(ctx.resolve(path), content).await {
            Ok(()) => ToolOutput::success(format!("Successfully wrote to {path}")),
            Err(e) => ToolOutput::error(format!("Error writing file '{path}': {e}")),
        }
    }
}
