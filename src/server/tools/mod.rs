//! Built-in tool implementations.

pub mod time;
pub mod weather;
