//! Search tool - instant-answer lookup
//!
//! Queries a DuckDuckGo-style instant answer endpoint and returns its
//! abstract. An empty abstract is a valid "nothing found" answer.

use super::{Tool, ToolContext, ToolKind, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;

/// Returned when the service answers but has nothing to say
pub const NO_RESULT_TEXT: &str = "No specific result found, please broaden the query.";

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

pub struct SearchTool;

impl SearchTool {
    async fn lookup(query: &str, ctx: &ToolContext) -> Result<String, String> {
        let response = ctx
            .http
            .get(&ctx.search_url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .timeout(ctx.request_timeout)
            .send()
            .await
            .map_err(|e| format!("Search failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Search failed: HTTP {status}"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("Search failed: {e}"))?;
        let answer: InstantAnswer = serde_json::from_str(&body)
            .map_err(|e| format!("Search failed: could not decode response: {e}"))?;

        Ok(summarize(answer))
    }
}

fn summarize(answer: InstantAnswer) -> String {
    let text = answer.abstract_text.trim();
    if text.is_empty() {
        NO_RESULT_TEXT.to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    async fn run(&self, argument: &str, ctx: &ToolContext) -> ToolOutput {
        let query = argument.trim();
        tracing::info!(query = %query, "Searching");
        match Self::lookup(query, ctx).await {
            Ok(text) => ToolOutput::success(text),
            Err(message) => ToolOutput::error(message),
        }
    }
}
