//! The fixed tool registry and its dispatch path.

use crate::error::GemchatError;
use crate::protocol::{ToolInfo, ToolRequest, ToolResponse};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// One callable tool. Tools are stateless per call: nothing carries over
/// between invocations.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema for the tool's arguments.
    fn parameters(&self) -> Value;
    /// Execute with the supplied arguments. Errors are caught by the registry
    /// and turned into failure responses.
    async fn call(&self, arguments: &Map<String, Value>) -> Result<String>;
}

/// Fixed set of tools, assembled once at server startup.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// The registry served by a stock gemchat tool server.
    pub fn with_builtin_tools() -> Self {
        Self::new(vec![
            Box::new(super::tools::time::GetTime),
            Box::new(super::tools::weather::GetAlerts::new()),
            Box::new(super::tools::weather::GetForecast::new()),
        ])
    }

    /// Metadata for every registered tool, in registration order.
    pub fn catalog(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up and execute one tool. Never panics and never propagates an
    /// error: every failure becomes a failure response for the model to see.
    pub async fn dispatch(&self, request: &ToolRequest) -> ToolResponse {
        let tool = match self.tools.iter().find(|t| t.name() == request.tool_name) {
            Some(tool) => tool,
            None => {
                debug!(tool = %request.tool_name, "unknown tool requested");
                return ToolResponse::error(
                    GemchatError::ToolNotFound(request.tool_name.clone()).to_string(),
                );
            }
        };

        debug!(tool = %request.tool_name, "executing tool");
        match tool.call(&request.arguments).await {
            Ok(result) => ToolResponse::success(result),
            Err(e) => {
                error!(tool = %request.tool_name, "tool failed: {}", e);
                ToolResponse::error(
                    GemchatError::ToolExecution {
                        tool: request.tool_name.clone(),
                        message: format!("{:#}", e),
                    }
                    .to_string(),
                )
            }
        }
    }
}

/// Pull a required string argument out of a tool's argument object.
pub fn require_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing or non-string argument '{}'", key))
}

/// Pull a required numeric argument out of a tool's argument object. Accepts
/// numbers or numeric strings, since models are loose about types.
pub fn require_f64(arguments: &Map<String, Value>, key: &str) -> Result<f64> {
    let value = arguments
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("missing argument '{}'", key))?;
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("argument '{}' is not a valid number", key)),
        Value::String(s) => s
            .parse()
            .map_err(|_| anyhow::anyhow!("argument '{}' is not a valid number", key)),
        _ => Err(anyhow::anyhow!("argument '{}' is not a number", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn description(&self) -> &'static str {
            "Echoes its input back"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn call(&self, arguments: &Map<String, Value>) -> Result<String> {
            Ok(require_str(arguments, "text")?.to_string())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Tool for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }
        fn description(&self) -> &'static str {
            "Fails on every call"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn call(&self, _arguments: &Map<String, Value>) -> Result<String> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    fn request(name: &str, args: Value) -> ToolRequest {
        ToolRequest {
            tool_name: name.to_string(),
            arguments: args.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let registry = ToolRegistry::new(vec![Box::new(Echo)]);
        let resp = registry
            .dispatch(&request("echo", json!({"text": "hello"})))
            .await;
        assert_eq!(resp.result, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_failure_not_panic() {
        let registry = ToolRegistry::new(vec![Box::new(Echo)]);
        let resp = registry.dispatch(&request("frobnicate", json!({}))).await;
        assert!(resp.is_error());
        assert!(resp.error.unwrap().contains("tool not found"));
    }

    #[tokio::test]
    async fn test_dispatch_tool_error_is_contained() {
        let registry = ToolRegistry::new(vec![Box::new(AlwaysFails)]);
        let resp = registry.dispatch(&request("always_fails", json!({}))).await;
        assert!(resp.is_error());
        assert!(resp.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_dispatch_bad_arguments_is_contained() {
        let registry = ToolRegistry::new(vec![Box::new(Echo)]);
        let resp = registry.dispatch(&request("echo", json!({}))).await;
        assert!(resp.is_error());
    }

    #[test]
    fn test_catalog_lists_registered_tools() {
        let registry = ToolRegistry::new(vec![Box::new(Echo), Box::new(AlwaysFails)]);
        let catalog = registry.catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].name, "echo");
        assert!(catalog[0].parameters.is_object());
    }

    #[test]
    fn test_builtin_registry_contents() {
        let registry = ToolRegistry::with_builtin_tools();
        let names: Vec<String> = registry.catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["get_time", "get_alerts", "get_forecast"]);
    }

    #[test]
    fn test_require_f64_accepts_numeric_strings() {
        let mut args = Map::new();
        args.insert("latitude".to_string(), json!("37.77"));
        assert_eq!(require_f64(&args, "latitude").unwrap(), 37.77);

        args.insert("longitude".to_string(), json!(-122.42));
        assert_eq!(require_f64(&args, "longitude").unwrap(), -122.42);

        assert!(require_f64(&args, "missing").is_err());
    }
}
