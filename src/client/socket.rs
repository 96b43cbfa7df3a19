//! Unix socket client for communicating with the tool server.

use crate::config::Config;
use crate::error::GemchatError;
use crate::protocol::{framing, Message, Reply, ToolInfo, ToolRequest, ToolResponse};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Request/response channel to the tool server. The production implementation
/// talks over the Unix socket; tests substitute in-process fakes.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Invoke one tool and return its result. Transport-level failures come
    /// back as errors; tool-level failures arrive inside the response.
    async fn call_tool(&self, request: ToolRequest) -> Result<ToolResponse, GemchatError>;

    /// Fetch the server's tool catalog.
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, GemchatError>;
}

/// Socket-backed transport to the running tool server.
pub struct SocketTransport {
    socket_path: PathBuf,
}

impl SocketTransport {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            socket_path: Config::socket_path()?,
        })
    }

    async fn exchange(&self, message: &Message) -> Result<Reply, GemchatError> {
        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| GemchatError::Transport("connection timeout".to_string()))?
            .map_err(|e| {
                GemchatError::Transport(format!(
                    "failed to connect to tool server at {}: {}",
                    self.socket_path.display(),
                    e
                ))
            })?;

        framing::write_message(&mut stream, message)
            .await
            .map_err(|e| GemchatError::Transport(format!("failed to send request: {}", e)))?;

        tokio::time::timeout(CALL_TIMEOUT, framing::read_message(&mut stream))
            .await
            .map_err(|_| GemchatError::Transport("tool call timed out".to_string()))?
            .map_err(|e| GemchatError::Transport(format!("failed to read reply: {}", e)))
    }
}

#[async_trait]
impl ToolTransport for SocketTransport {
    async fn call_tool(&self, request: ToolRequest) -> Result<ToolResponse, GemchatError> {
        match self.exchange(&Message::CallTool(request)).await? {
            Reply::Tool(response) => Ok(response),
            other => Err(GemchatError::Transport(format!(
                "unexpected reply from tool server: {:?}",
                other
            ))),
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolInfo>, GemchatError> {
        match self.exchange(&Message::ListTools).await? {
            Reply::Tools { tools } => Ok(tools),
            other => Err(GemchatError::Transport(format!(
                "unexpected reply from tool server: {:?}",
                other
            ))),
        }
    }
}
