//! Completion API integration.
//!
//! The model is asked, on every call, to answer with a single JSON decision:
//! either invoke a tool or reply with final text. The raw decision is parsed
//! into the tagged [`Decision`] type at this boundary so the session logic
//! never touches loose JSON shapes.

pub mod gemini;

use crate::error::GemchatError;
use crate::protocol::ToolInfo;
use crate::transcript::Transcript;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map;

/// A completion backend. The production implementation is
/// [`gemini::GeminiClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the system instruction and full transcript, return the model's
    /// raw text reply.
    async fn complete(
        &self,
        system_instruction: &str,
        transcript: &Transcript,
    ) -> Result<String, GemchatError>;
}

/// The model's parsed decision for one call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Decision {
    /// Invoke a tool before answering.
    Tool {
        name: String,
        #[serde(default)]
        parameter: Map<String, serde_json::Value>,
    },
    /// Final conversational answer.
    Text { text: String },
}

/// Parse the model's raw reply into a decision. Models sometimes wrap the
/// JSON in markdown fences despite instructions, so those are stripped first.
/// Returns None when the reply is not valid decision JSON; callers fall back
/// to treating the raw text as the final answer.
pub fn parse_decision(raw: &str) -> Option<Decision> {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        // Drop the language specifier line and the trailing fence. Only a
        // fence at the very end closes the block; backticks inside the JSON
        // stay put.
        text = stripped;
        if let Some(newline) = text.find('\n') {
            let first_line = &text[..newline];
            if first_line.chars().all(|c| c.is_ascii_alphanumeric()) {
                text = &text[newline + 1..];
            }
        }
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text);
    }
    serde_json::from_str(text.trim()).ok()
}

/// Build the system instruction: the tool catalog plus the decision format
/// the model must answer in.
pub fn build_system_instruction(tools: &[ToolInfo]) -> String {
    let catalog = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"You are an assistant that decides whether to use a tool to answer the user.
You have access to the following tools:
{catalog}

Conversation turns labelled "Tool result:" contain output from tools you already invoked.

Respond with ONLY a single JSON object:
1. If a tool is needed: {{"type": "tool", "name": "tool_name", "parameter": {{"arg": "value"}}}}
2. Otherwise: {{"type": "text", "text": "Your conversational answer here."}}

Do not add explanations or markdown formatting like ```json.
When answering after a tool result, answer the user's question directly and do not mention the tool name or raw data."#
    )
}
