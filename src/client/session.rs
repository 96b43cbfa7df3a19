//! The chat session: transcript ownership and the model/tool dispatch loop.
//!
//! One session owns one transcript. Each user turn runs model calls until the
//! model produces a final text answer, relaying at most one tool call at a
//! time to the tool server. Tool and transport failures are appended to the
//! transcript as failure results so the model can react; only the model API
//! itself failing aborts the turn.

use crate::client::llm::{build_system_instruction, parse_decision, CompletionClient, Decision};
use crate::client::socket::ToolTransport;
use crate::error::GemchatError;
use crate::protocol::{ToolInfo, ToolRequest};
use crate::transcript::Transcript;
use std::sync::Arc;
use tracing::debug;

pub struct ChatSession {
    completion: Arc<dyn CompletionClient>,
    transport: Arc<dyn ToolTransport>,
    system_instruction: String,
    max_tool_cycles: u32,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        transport: Arc<dyn ToolTransport>,
        tools: &[ToolInfo],
        max_tool_cycles: u32,
    ) -> Self {
        Self {
            completion,
            transport,
            system_instruction: build_system_instruction(tools),
            max_tool_cycles,
            transcript: Transcript::new(),
        }
    }

    /// Process one user turn and return the final answer text.
    ///
    /// The input must be non-empty after trimming; the REPL re-prompts on
    /// empty lines before calling this. Errors returned here are non-fatal:
    /// the caller reports them and keeps the loop alive.
    pub async fn send(&mut self, user_text: &str) -> Result<String, GemchatError> {
        self.transcript.push_user(user_text.trim());

        for _cycle in 0..self.max_tool_cycles {
            let raw = self
                .completion
                .complete(&self.system_instruction, &self.transcript)
                .await?;

            match parse_decision(&raw) {
                Some(Decision::Tool { name, parameter }) => {
                    debug!(tool = %name, "model requested tool call");
                    self.transcript.push_model(raw.trim());

                    let request = ToolRequest {
                        tool_name: name,
                        arguments: parameter,
                    };
                    let tool_turn = match self.transport.call_tool(request).await {
                        Ok(response) => match (response.result, response.error) {
                            (Some(result), _) => result,
                            (None, Some(error)) => format!("ERROR: {}", error),
                            (None, None) => "ERROR: empty reply from tool server".to_string(),
                        },
                        Err(e) => e.as_failure_text(),
                    };
                    self.transcript.push_tool(tool_turn);
                }
                Some(Decision::Text { text }) => {
                    self.transcript.push_model(text.clone());
                    return Ok(text);
                }
                None => {
                    // Not valid decision JSON; surface the raw text as the answer.
                    debug!("model reply was not a decision, using raw text");
                    let text = raw.trim().to_string();
                    self.transcript.push_model(text.clone());
                    return Ok(text);
                }
            }
        }

        Err(GemchatError::ModelApi(format!(
            "tool cycle limit reached ({} model calls without a final answer)",
            self.max_tool_cycles
        )))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}
