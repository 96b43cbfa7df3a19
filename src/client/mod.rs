//! Client module for the gemchat CLI.
//!
//! The client side owns the conversation:
//! - Reads user lines from the terminal
//! - Sends the transcript to the Gemini API
//! - Relays tool-invocation decisions to the tool server via Unix socket
//! - Prints the model's final text to stdout

pub mod llm;
pub mod repl;
pub mod session;
pub mod socket;

pub use repl::{run_chat, run_oneshot};
pub use session::ChatSession;
