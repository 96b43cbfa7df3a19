//! Gemini completion backend.
//!
//! Uses the generateContent endpoint of the Google Generative Language API.

use crate::error::GemchatError;
use crate::transcript::{Role, Transcript};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini backend for the completion API.
pub struct GeminiClient {
    pub model: String,
    temperature: f32,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client. The caller has already validated the key.
    pub fn new(model: String, temperature: f32, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            model,
            temperature,
            api_key,
            client,
        }
    }
}

#[async_trait]
impl super::CompletionClient for GeminiClient {
    async fn complete(
        &self,
        system_instruction: &str,
        transcript: &Transcript,
    ) -> Result<String, GemchatError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let request = GeminiRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
            contents: render_contents(transcript),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GemchatError::ModelApi(format!("Failed to reach Gemini API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<GeminiErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GemchatError::ModelApi(format!(
                "Gemini API request failed with status {}: {}",
                status, message
            )));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GemchatError::ModelApi(format!("Failed to parse Gemini response: {}", e)))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GemchatError::ModelApi("Empty response from Gemini".to_string()))?;

        Ok(text)
    }
}

/// Render the transcript into Gemini contents. Gemini only knows "user" and
/// "model" roles, so tool results go in as user turns with a marker prefix
/// the system instruction explains.
fn render_contents(transcript: &Transcript) -> Vec<Content> {
    transcript
        .turns()
        .iter()
        .map(|turn| match turn.role {
            Role::User => Content::new("user", turn.content.clone()),
            Role::Model => Content::new("model", turn.content.clone()),
            Role::Tool => Content::new("user", format!("Tool result: {}", turn.content)),
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, text: String) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contents_maps_roles() {
        let mut transcript = Transcript::new();
        transcript.push_user("what time is it?");
        transcript.push_model(r#"{"type":"tool","name":"get_time","parameter":{}}"#);
        transcript.push_tool("2026-08-29T10:00:00Z");

        let contents = render_contents(&transcript);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
        assert_eq!(contents[2].role, "user");
        assert!(contents[2].parts[0].text.starts_with("Tool result:"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"type\":\"text\",\"text\":\"hi\"}"}], "role": "model"}}
            ]
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.candidates[0].content.parts.len(), 1);
    }

    #[test]
    fn test_empty_candidates_parse() {
        let parsed: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
