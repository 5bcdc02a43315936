//! Execute tool - runs a local program
//!
//! The argument is split on whitespace; the first token names the program
//! and the rest are passed literally. No shell is involved.

use super::{ExecutionPolicy, Tool, ToolContext, ToolKind, ToolOutput};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

const MAX_OUTPUT_LENGTH: usize = 128 * 1024; // 128KB
const SNIP_SIZE: usize = 4 * 1024; // 4KB each end

pub const EMPTY_COMMAND_TEXT: &str = "Error: Empty command.";
pub const DISABLED_TEXT: &str = "Execution disabled by operator policy.";

pub struct ExecuteTool;

impl ExecuteTool {
    async fn execute(argv: &[&str], ctx: &ToolContext) -> ToolOutput {
        let Some((program, args)) = argv.split_first() else {
            return ToolOutput::error(EMPTY_COMMAND_TEXT);
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&ctx.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(format!("Error executing command: {e}")),
        };

        let timeout = ctx.command_timeout;
        tokio::select! {
            // Dropping the wait future drops the child, which kills it
            () = tokio::time::sleep(timeout) => {
                ToolOutput::error(format!("[command timed out after {timeout:?}]"))
            }

            result = child.wait_with_output() => {
                match result {
                    Ok(output) => {
                        let stdout = String::from_utf8_lossy(&output.stdout);
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        let combined = format!("{stdout}{stderr}");
                        let formatted = truncate_output(combined.trim());

                        if output.status.success() {
                            ToolOutput::success(formatted)
                        } else {
                            ToolOutput::error(format!(
                                "Command failed: {}\nOutput: {formatted}",
                                output.status
                            ))
                        }
                    }
                    Err(e) => ToolOutput::error(format!("Error executing command: {e}")),
                }
            }
        }
    }
}

/// Keep the head and tail of oversized output
fn truncate_output(output: &str) -> String {
    if output.len() <= MAX_OUTPUT_LENGTH {
        return output.to_string();
    }

    let mut head_end = SNIP_SIZE;
    while !output.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = output.len() - SNIP_SIZE;
    while !output.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    format!(
        "[output truncated in middle: got {} bytes, max is {} bytes]\n{}\n\n[snip]\n\n{}",
        output.len(),
        MAX_OUTPUT_LENGTH,
        output.get(..head_end).unwrap_or_default(),
        output.get(tail_start..).unwrap_or_default()
    )
}

#[async_trait]
impl Tool for ExecuteTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Execute
    }

    async fn run(&self, argument: &str, ctx: &ToolContext) -> ToolOutput {
        if ctx.execution == ExecutionPolicy::Disabled {
            tracing::warn!(command = %argument, "Execution refused by policy");
            return ToolOutput::error(DISABLED_TEXT);
        }

        let argv: Vec<&str> = argument.split_whitespace().collect();
        if argv.is_empty() {
            return ToolOutput::error(EMPTY_COMMAND_TEXT);
        }

        tracing::warn!(command = %argument, "Executing local command");
        Self::execute(&argv, ctx).await
    }
}
