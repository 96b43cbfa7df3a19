//! Current-time tool.

use crate::server::registry::Tool;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

/// Returns the current UTC time as an RFC 3339 timestamp. Takes no arguments.
pub struct GetTime;

#[async_trait]
impl Tool for GetTime {
    fn name(&self) -> &'static str {
        "get_time"
    }

    fn description(&self) -> &'static str {
        "Gets the current date and time (UTC, RFC 3339)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn call(&self, _arguments: &Map<String, Value>) -> Result<String> {
        Ok(Utc::now().to_rfc3339())
    }
}
