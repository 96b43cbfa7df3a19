//! Tool server module.
//!
//! The tool server is a background process that:
//! - Listens on a Unix domain socket
//! - Holds a fixed registry of callable tools
//! - Executes one tool per request, statelessly, and replies with the result
//!
//! It never crashes on a bad request: unknown tools and tool failures are
//! converted to failure replies.

pub mod listener;
pub mod registry;
pub mod tools;

pub use listener::ToolServer;
pub use registry::ToolRegistry;
