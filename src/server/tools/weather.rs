//! Weather tools backed by the US National Weather Service API.

use crate::server::registry::{require_f64, require_str, Tool};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::info;

const NWS_API_BASE: &str = "https://api.weather.gov";
const USER_AGENT: &str = "gemchat/0.1 (contact@example.com)";

/// Shared HTTP plumbing for the NWS endpoints.
struct NwsClient {
    client: Client,
}

impl NwsClient {
    fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        info!("NWS request: {}", url);
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/geo+json")
            .send()
            .await
            .context("Failed to reach the NWS API")?;

        if !response.status().is_success() {
            anyhow::bail!("NWS API returned status {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse NWS response")
    }
}

/// Active weather alerts for a US state.
pub struct GetAlerts {
    nws: NwsClient,
}

impl GetAlerts {
    pub fn new() -> Self {
        Self {
            nws: NwsClient::new(),
        }
    }
}

#[async_trait]
impl Tool for GetAlerts {
    fn name(&self) -> &'static str {
        "get_alerts"
    }

    fn description(&self) -> &'static str {
        "Gets active weather alerts for a US state. Argument 'state' is a two-letter code (e.g. CA, NY)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "state": {
                    "type": "string",
                    "description": "Two-letter US state code (e.g., CA, NY)"
                }
            },
            "required": ["state"]
        })
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String> {
        let state = require_str(arguments, "state")?.to_uppercase();
        let url = format!("{}/alerts/active/area/{}", NWS_API_BASE, state);
        let data = self.nws.get_json(&url).await?;
        Ok(format_alerts(&state, &data))
    }
}

/// Point forecast for a latitude/longitude pair.
pub struct GetForecast {
    nws: NwsClient,
}

impl GetForecast {
    pub fn new() -> Self {
        Self {
            nws: NwsClient::new(),
        }
    }
}

#[async_trait]
impl Tool for GetForecast {
    fn name(&self) -> &'static str {
        "get_forecast"
    }

    fn description(&self) -> &'static str {
        "Gets the weather forecast for a location given 'latitude' and 'longitude'."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": {"type": "number", "description": "Latitude of the location"},
                "longitude": {"type": "number", "description": "Longitude of the location"}
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String> {
        let latitude = require_f64(arguments, "latitude")?;
        let longitude = require_f64(arguments, "longitude")?;

        // The NWS API is two-step: resolve the point to a gridpoint forecast URL.
        let points_url = format!("{}/points/{},{}", NWS_API_BASE, latitude, longitude);
        let points = self.nws.get_json(&points_url).await?;

        let forecast_url = points
            .pointer("/properties/forecast")
            .and_then(|v| v.as_str())
            .context("No forecast URL for the given coordinates")?
            .to_string();

        let forecast = self.nws.get_json(&forecast_url).await?;
        Ok(format_forecast(&forecast))
    }
}

/// Render an alerts response into model-readable text.
fn format_alerts(state: &str, data: &Value) -> String {
    let features = match data.get("features").and_then(|f| f.as_array()) {
        Some(features) => features,
        None => return "Unable to fetch alerts or no alerts found.".to_string(),
    };

    if features.is_empty() {
        return format!("No active alerts for the state: {}.", state);
    }

    features
        .iter()
        .map(|f| {
            let event = f
                .pointer("/properties/event")
                .and_then(|v| v.as_str())
                .unwrap_or("N/A");
            let area = f
                .pointer("/properties/areaDesc")
                .and_then(|v| v.as_str())
                .unwrap_or("N/A");
            format!("Event: {}, Area: {}", event, area)
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Render a forecast response into model-readable text, first five periods.
fn format_forecast(data: &Value) -> String {
    let periods = match data.pointer("/properties/periods").and_then(|p| p.as_array()) {
        Some(periods) if !periods.is_empty() => periods,
        _ => return "No forecast periods found in the data.".to_string(),
    };

    periods
        .iter()
        .take(5)
        .map(|p| {
            let name = p.get("name").and_then(|v| v.as_str()).unwrap_or("N/A");
            let temp = p
                .get("temperature")
                .and_then(|v| v.as_i64())
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string());
            let unit = p
                .get("temperatureUnit")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let detail = p
                .get("detailedForecast")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            format!("{}: {}°{}, {}", name, temp, unit, detail)
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
