//! Unix socket listener for the tool server.
//!
//! Accepts client connections and routes requests to the tool registry.

use crate::config::Config;
use crate::protocol::{framing, Message, Reply};
use crate::server::registry::ToolRegistry;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};

/// The tool server that listens for client connections.
pub struct ToolServer {
    socket_path: PathBuf,
    registry: Arc<ToolRegistry>,
}

impl ToolServer {
    /// Create a server over the given registry.
    pub fn new(registry: ToolRegistry) -> Result<Self> {
        Ok(Self {
            socket_path: Config::socket_path()?,
            registry: Arc::new(registry),
        })
    }

    /// Run the server. Writes the startup status file once the socket is
    /// bound so a spawning client knows the server came up.
    pub async fn run(&self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.socket_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create socket directory: {}", parent.display())
            })?;
        }

        // Remove existing socket file
        if self.socket_path.exists() {
            tokio::fs::remove_file(&self.socket_path).await.with_context(|| {
                format!(
                    "Failed to remove existing socket: {}",
                    self.socket_path.display()
                )
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to socket: {}", self.socket_path.display()))?;

        info!(
            "Tool server listening on {} ({} tools registered)",
            self.socket_path.display(),
            self.registry.len()
        );

        self.write_pid_file().await?;
        write_startup_status("OK").await;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, registry).await {
                            error!("Error handling client: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Write the PID file.
    async fn write_pid_file(&self) -> Result<()> {
        let pid_path = Config::pid_path()?;
        if let Some(parent) = pid_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pid = std::process::id();
        tokio::fs::write(&pid_path, pid.to_string()).await?;
        info!("PID file written to {}", pid_path.display());
        Ok(())
    }
}

/// Write the startup status file ("OK" or "ERROR: ...") for the spawning
/// client to poll.
pub async fn write_startup_status(status: &str) {
    if let Ok(path) = Config::startup_status_path() {
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let _ = tokio::fs::write(&path, status).await;
    }
}

/// Handle a single client connection: one framed request, one framed reply.
async fn handle_client(mut stream: UnixStream, registry: Arc<ToolRegistry>) -> Result<()> {
    debug!("Client connected");

    let message: Message = framing::read_message(&mut stream).await?;

    let reply = match message {
        Message::CallTool(request) => {
            debug!("Tool call: {}", request.tool_name);
            Reply::Tool(registry.dispatch(&request).await)
        }
        Message::ListTools => Reply::Tools {
            tools: registry.catalog(),
        },
        Message::Status => {
            let names: Vec<String> = registry.catalog().into_iter().map(|t| t.name).collect();
            Reply::Status {
                info: format!("serving {} tools: {}", registry.len(), names.join(", ")),
            }
        }
        Message::Shutdown => {
            info!("Received shutdown request");
            if let Ok(socket_path) = Config::socket_path() {
                let _ = tokio::fs::remove_file(&socket_path).await;
            }
            if let Ok(pid_path) = Config::pid_path() {
                let _ = tokio::fs::remove_file(&pid_path).await;
            }
            std::process::exit(0);
        }
    };

    framing::write_message(&mut stream, &reply).await?;
    debug!("Reply sent");

    Ok(())
}

/// Check if the tool server is running and answering.
pub async fn is_server_running() -> bool {
    if let Ok(socket_path) = Config::socket_path() {
        if socket_path.exists() {
            if let Ok(mut stream) = UnixStream::connect(&socket_path).await {
                if framing::write_message(&mut stream, &Message::Status)
                    .await
                    .is_ok()
                {
                    if let Ok(_reply) = framing::read_message::<_, Reply>(&mut stream).await {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Stop the running tool server.
pub async fn stop_server() -> Result<()> {
    let socket_path = Config::socket_path()?;
    if !socket_path.exists() {
        return Err(anyhow::anyhow!("Tool server is not running"));
    }

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .context("Failed to connect to tool server")?;

    framing::write_message(&mut stream, &Message::Shutdown).await?;
    info!("Shutdown request sent");

    Ok(())
}

/// Fetch the server's status line, if it is running.
pub async fn server_status() -> Result<String> {
    let socket_path = Config::socket_path()?;
    let mut stream = UnixStream::connect(&socket_path)
        .await
        .context("Failed to connect to tool server")?;

    framing::write_message(&mut stream, &Message::Status).await?;
    match framing::read_message::<_, Reply>(&mut stream).await? {
        Reply::Status { info } => Ok(info),
        other => Err(anyhow::anyhow!("unexpected reply: {:?}", other)),
    }
}

/// Get the server's PID if running.
pub async fn get_server_pid() -> Option<u32> {
    if let Ok(pid_path) = Config::pid_path() {
        if let Ok(contents) = tokio::fs::read_to_string(&pid_path).await {
            return contents.trim().parse().ok();
        }
    }
    None
}
