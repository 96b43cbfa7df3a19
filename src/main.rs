//! gemchat - a terminal chat client for Gemini with a background tool server.
//!
//! The chat loop forwards user prompts to the Gemini API; when the model asks
//! for a tool, the request is relayed to a local tool server over a Unix
//! socket and the result is fed back into the conversation.

mod client;
mod config;
mod error;
mod protocol;
mod server;
mod transcript;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::llm::gemini::GeminiClient;
use client::socket::{SocketTransport, ToolTransport};
use client::ChatSession;
use config::Config;
use server::ToolRegistry;
use std::process::Command as ProcessCommand;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(author, version, about = "Terminal chat for Gemini with local tools")]
#[command(
    long_about = "Chat with Gemini from the terminal. The model can call local tools \
(current time, weather alerts, forecasts) served by a background process."
)]
struct Cli {
    /// One-shot mode - answer this prompt and exit
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Override the configured model
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Override the configured temperature
    #[arg(short = 't', long, value_name = "TEMP")]
    temperature: Option<f32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the tool server
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
    /// List the registered tools
    Tools,
    /// Open configuration file in $EDITOR
    Config,
}

#[derive(Subcommand)]
enum ServerAction {
    /// Start the tool server in the background
    Start,
    /// Stop the running tool server
    Stop,
    /// Check tool server status
    Status,
    /// Run the tool server in the foreground (for debugging)
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Server { action }) => handle_server(action).await,
        Some(Commands::Tools) => handle_tools().await,
        Some(Commands::Config) => handle_config(),
        None => handle_chat(cli.prompt, cli.model, cli.temperature).await,
    }
}

/// Handle server subcommands.
async fn handle_server(action: ServerAction) -> Result<()> {
    match action {
        ServerAction::Start => start_server().await,
        ServerAction::Stop => stop_server().await,
        ServerAction::Status => server_status().await,
        ServerAction::Run => run_server_foreground().await,
    }
}

/// Start the tool server in the background.
/// Note: All output goes to stderr to keep stdout clean for chat output.
async fn start_server() -> Result<()> {
    if server::listener::is_server_running().await {
        eprintln!("Tool server is already running");
        return Ok(());
    }

    // Clear any existing startup status file
    let status_path = Config::startup_status_path()?;
    let _ = std::fs::remove_file(&status_path);

    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    let child = ProcessCommand::new(&exe)
        .args(["server", "run"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("Failed to start tool server process")?;

    let pid = child.id();
    eprintln!("Starting tool server (PID {})...", pid);

    // Wait for startup status (poll the status file)
    let max_wait = 3000; // 3 seconds max
    let poll_interval = 100; // 100ms
    let mut waited = 0;

    while waited < max_wait {
        tokio::time::sleep(tokio::time::Duration::from_millis(poll_interval)).await;
        waited += poll_interval;

        if let Ok(status) = std::fs::read_to_string(&status_path) {
            if status.starts_with("OK") {
                eprintln!("Tool server is ready");
                return Ok(());
            } else if status.starts_with("ERROR:") {
                let _ = std::fs::remove_file(&status_path);
                let error_msg = status.strip_prefix("ERROR: ").unwrap_or(&status);
                eprintln!("\nTool server failed to start:\n{}", error_msg);
                std::process::exit(1);
            }
        }

        // Also check if the socket answers already
        if server::listener::is_server_running().await {
            eprintln!("Tool server is ready");
            return Ok(());
        }
    }

    // Timeout - check status file one more time
    if let Ok(status) = std::fs::read_to_string(&status_path) {
        let _ = std::fs::remove_file(&status_path);
        if status.starts_with("ERROR:") {
            let error_msg = status.strip_prefix("ERROR: ").unwrap_or(&status);
            eprintln!("\nTool server failed to start:\n{}", error_msg);
            std::process::exit(1);
        }
    }

    eprintln!("\nTool server startup timed out. Run 'gemchat server run' to see errors.");
    std::process::exit(1);
}

/// Stop the running tool server.
async fn stop_server() -> Result<()> {
    if !server::listener::is_server_running().await {
        println!("Tool server is not running");
        return Ok(());
    }

    server::listener::stop_server().await?;
    println!("Tool server stopped");
    Ok(())
}

/// Show tool server status.
async fn server_status() -> Result<()> {
    if server::listener::is_server_running().await {
        println!("Tool server: running");
        if let Some(pid) = server::listener::get_server_pid().await {
            println!("PID: {}", pid);
        }
        if let Ok(info) = server::listener::server_status().await {
            println!("Registry: {}", info);
        }
        println!("Socket: {}", Config::socket_path()?.display());
    } else {
        println!("Tool server: not running");
        println!("Start with: gemchat server start");
    }
    Ok(())
}

/// Run the tool server in the foreground.
async fn run_server_foreground() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gemchat=info".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap()),
        )
        .init();

    info!("Starting gemchat tool server...");

    let registry = ToolRegistry::with_builtin_tools();
    let srv = server::ToolServer::new(registry)?;
    if let Err(e) = srv.run().await {
        server::listener::write_startup_status(&format!("ERROR: {:#}", e)).await;
        return Err(e);
    }
    Ok(())
}

/// List registered tools, from the live server when possible.
async fn handle_tools() -> Result<()> {
    let tools = if server::listener::is_server_running().await {
        SocketTransport::new()?.list_tools().await?
    } else {
        println!("(tool server not running; showing built-in registry)\n");
        ToolRegistry::with_builtin_tools().catalog()
    };

    println!("Registered Tools");
    println!("================\n");
    for tool in tools {
        println!("  {}\n    {}\n", tool.name, tool.description);
    }
    Ok(())
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !config_path.exists() {
        let default_config = Config::default();
        default_config.save()?;
        println!("Created default config at {}", config_path.display());
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

/// Owned handle on the background tool server. If this session spawned the
/// server, it shuts it down on exit; a server that was already running is
/// left alone.
struct ServerHandle {
    spawned: bool,
}

impl ServerHandle {
    async fn ensure_running() -> Result<Self> {
        if server::listener::is_server_running().await {
            return Ok(Self { spawned: false });
        }

        eprintln!("Starting tool server...");
        start_server().await?;

        if !server::listener::is_server_running().await {
            eprintln!("Failed to start tool server. Check your configuration.");
            std::process::exit(1);
        }

        Ok(Self { spawned: true })
    }

    async fn shutdown(self) {
        if self.spawned {
            let _ = server::listener::stop_server().await;
        }
    }

    /// Run `body`, then release the handle. Every exit path goes through the
    /// shutdown so a session-spawned server never outlives the session, even
    /// when setup fails partway.
    async fn run_then_shutdown<Fut>(self, body: Fut) -> Result<()>
    where
        Fut: std::future::Future<Output = Result<()>>,
    {
        let result = body.await;
        self.shutdown().await;
        result
    }
}

/// Handle chat mode (interactive or one-shot).
async fn handle_chat(
    prompt: Option<String>,
    model_override: Option<String>,
    temperature_override: Option<f32>,
) -> Result<()> {
    let config = Config::load()?;

    // Credential check happens before the server is touched or any network
    // call is made; a missing key is fatal here.
    let api_key = Config::api_key()?;

    let handle = ServerHandle::ensure_running().await?;

    handle
        .run_then_shutdown(async {
            let transport: Arc<dyn ToolTransport> = Arc::new(SocketTransport::new()?);
            let tools = transport
                .list_tools()
                .await
                .context("Failed to fetch tool catalog from tool server")?;

            let model = model_override.unwrap_or(config.model.name);
            let temperature = temperature_override.unwrap_or(config.model.temperature);
            let completion = Arc::new(GeminiClient::new(model, temperature, api_key));

            let session =
                ChatSession::new(completion, transport, &tools, config.model.max_tool_cycles);

            match prompt {
                Some(prompt) => client::run_oneshot(session, &prompt).await,
                None => client::run_chat(session).await,
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{framing, Message};

    #[tokio::test]
    async fn test_spawned_server_stopped_when_setup_fails() {
        // Point the runtime paths at a scratch directory and stand in for the
        // server with a bare listener.
        let dir = std::env::temp_dir().join(format!("gemchat-handle-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::env::set_var("XDG_RUNTIME_DIR", &dir);
        let listener = tokio::net::UnixListener::bind(dir.join("gemchat.sock")).unwrap();

        let accept = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            framing::read_message::<_, Message>(&mut stream).await.unwrap()
        });

        let handle = ServerHandle { spawned: true };
        let err = handle
            .run_then_shutdown(async { anyhow::bail!("failed to fetch tool catalog") })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tool catalog"));

        // The handle still sent Shutdown despite the failed body.
        let msg = accept.await.unwrap();
        assert!(matches!(msg, Message::Shutdown));

        std::env::remove_var("XDG_RUNTIME_DIR");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_pre_existing_server_left_alone_on_failure() {
        let handle = ServerHandle { spawned: false };
        let err = handle
            .run_then_shutdown(async { anyhow::bail!("boom") })
            .await
            .unwrap_err();
        // Error propagates; no Shutdown is attempted for a server we did not spawn.
        assert_eq!(err.to_string(), "boom");
    }
}
