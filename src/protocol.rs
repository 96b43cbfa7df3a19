//! IPC protocol definitions for client-server communication.
//!
//! The protocol uses JSON over Unix domain sockets for simplicity and debuggability.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool invocation request, forwarded unchanged from the model's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Arguments for the tool, as a JSON object.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// The result of a single tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// The tool's output, if the invocation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error message, if the invocation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    /// Create a successful response carrying the tool's output.
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
        }
    }

    /// Create a failure response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    /// Whether this response indicates a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Metadata describing one registered tool, used to build the model's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: Value,
}

/// Message type for IPC communication, client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Invoke a tool and return its result.
    CallTool(ToolRequest),
    /// List the registered tools.
    ListTools,
    /// Request server status.
    Status,
    /// Shut the server down gracefully.
    Shutdown,
}

/// Reply type for IPC communication, server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Result of a tool invocation (success or failure).
    Tool(ToolResponse),
    /// The registered tool catalog.
    Tools { tools: Vec<ToolInfo> },
    /// Server status line.
    Status { info: String },
}

/// Framing for messages: length-prefixed JSON.
/// Format: 4 bytes (big-endian u32) length + JSON payload
pub mod framing {
    use anyhow::{anyhow, Result};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Write a length-prefixed message.
    pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
    where
        W: AsyncWriteExt + Unpin,
        T: serde::Serialize,
    {
        let json = serde_json::to_vec(message)?;
        let len = json.len() as u32;
        writer.write_all(&len.to_be_bytes()).await?;
        writer.write_all(&json).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read a length-prefixed message.
    pub async fn read_message<R, T>(reader: &mut R) -> Result<T>
    where
        R: AsyncReadExt + Unpin,
        T: serde::de::DeserializeOwned,
    {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;

        // Sanity check: max 1MB message
        if len > 1_000_000 {
            return Err(anyhow!("Message too large: {} bytes", len));
        }

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).await?;
        let message = serde_json::from_slice(&buf)?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success() {
        let resp = ToolResponse::success("72F and sunny");
        assert_eq!(resp.result, Some("72F and sunny".to_string()));
        assert!(resp.error.is_none());
        assert!(!resp.is_error());
    }

    #[test]
    fn test_response_error() {
        let resp = ToolResponse::error("tool not found: frobnicate");
        assert!(resp.result.is_none());
        assert!(resp.is_error());
    }

    #[test]
    fn test_request_serialization() {
        let mut args = Map::new();
        args.insert("state".to_string(), Value::String("NY".to_string()));
        let req = ToolRequest {
            tool_name: "get_alerts".to_string(),
            arguments: args,
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: ToolRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tool_name, req.tool_name);
        assert_eq!(parsed.arguments["state"], "NY");
    }

    #[test]
    fn test_request_missing_arguments_defaults_empty() {
        let parsed: ToolRequest = serde_json::from_str(r#"{"tool_name":"get_time"}"#).unwrap();
        assert_eq!(parsed.tool_name, "get_time");
        assert!(parsed.arguments.is_empty());
    }

    #[test]
    fn test_message_tagging() {
        let json = serde_json::to_string(&Message::ListTools).unwrap();
        assert!(json.contains("list_tools"));

        let shutdown: Message = serde_json::from_str(r#"{"type":"shutdown"}"#).unwrap();
        assert!(matches!(shutdown, Message::Shutdown));
    }

    #[tokio::test]
    async fn test_framing_round_trip() {
        let mut buf = Vec::new();
        let msg = Message::CallTool(ToolRequest {
            tool_name: "get_time".to_string(),
            arguments: Map::new(),
        });
        framing::write_message(&mut buf, &msg).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let read: Message = framing::read_message(&mut cursor).await.unwrap();
        match read {
            Message::CallTool(req) => assert_eq!(req.tool_name, "get_time"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_framing_rejects_oversized_message() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10_000_000u32.to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let result: Result<Message, _> = framing::read_message(&mut cursor).await;
        assert!(result.is_err());
    }
}
