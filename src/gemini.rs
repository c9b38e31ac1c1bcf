//! Gemini API client with function calling
//!
//! Wire-level access to `generateContent`: the decision layer hands over
//! conversation contents plus the tool catalogue, and gets back prose
//! and/or requested function calls. Uses a long-lived reqwest::Client for
//! connection pooling. Wire field names are camelCase per the API.

use crate::error::OrchestrationError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        }
    }

    /// One generateContent round. Any transport, protocol, or decoding
    /// failure (including the request timeout) comes back as
    /// `DecisionUnavailable`.
    pub async fn generate(
        &self,
        system_instructions: &str,
        contents: Vec<Content>,
        declarations: &[FunctionDeclaration],
    ) -> crate::Result<ModelReply> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::DecisionUnavailable(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        let tools = if declarations.is_empty() {
            None
        } else {
            Some(vec![ToolDeclarations {
                function_declarations: declarations.to_vec(),
            }])
        };

        let request = GeminiRequest {
            contents,
            tools,
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part::text(system_instructions)],
            },
        };

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                OrchestrationError::DecisionUnavailable(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(OrchestrationError::DecisionUnavailable(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::DecisionUnavailable(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response.candidates.into_iter().next().ok_or_else(|| {
            OrchestrationError::DecisionUnavailable("No response from Gemini API".to_string())
        })?;

        let content = candidate.content.ok_or_else(|| {
            OrchestrationError::DecisionUnavailable(format!(
                "Gemini candidate had no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        let mut text = String::new();
        let mut calls = Vec::new();
        for part in content.parts {
            if let Some(t) = part.text {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                calls.push(call);
            }
        }

        info!(call_count = calls.len(), "Gemini response received");

        Ok(ModelReply { text, calls })
    }
}

/// Decoded model output: prose plus any requested function calls.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
    pub calls: Vec<FunctionCall>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclarations>>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self { role: "user".to_string(), parts }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self { role: "model".to_string(), parts }
    }
}

/// One content part. Exactly one of the fields is set; the others stay
/// off the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Part {
            function_call: Some(call),
            ..Default::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Part {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// Catalogue entry in Gemini's declaration shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![
                Content::user(vec![Part::text("I want a loan of $10,000")]),
                Content::model(vec![Part::function_call(FunctionCall {
                    name: "verify_identity".to_string(),
                    args: json!({ "user_id": "user_123" }).as_object().unwrap().clone(),
                })]),
                Content::user(vec![Part::function_response(
                    "verify_identity",
                    json!({ "content": "SUCCESS: User found." }),
                )]),
            ],
            tools: Some(vec![ToolDeclarations {
                function_declarations: vec![FunctionDeclaration {
                    name: "verify_identity".to_string(),
                    description: "Checks if the user ID exists".to_string(),
                    parameters: json!({ "type": "object", "properties": {} }),
                }],
            }]),
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part::text("You are a loan officer")],
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("functionDeclarations"));
        assert!(json.contains("functionCall"));
        assert!(json.contains("functionResponse"));
        assert!(json.contains("systemInstruction"));
        assert!(json.contains("maxOutputTokens"));
        assert!(json.contains("I want a loan of $10,000"));
    }

    #[test]
    fn test_text_part_leaves_function_fields_off_the_wire() {
        let json = serde_json::to_string(&Part::text("hello")).unwrap();
        assert_eq!(json, r#"{"text":"hello"}"#);
    }

    #[test]
    fn test_response_parsing_with_function_call() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "functionCall": { "name": "check_credit_score", "args": { "user_id": "user_789" } } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        let content = response.candidates[0].content.as_ref().unwrap();
        let call = content.parts[0].function_call.as_ref().unwrap();

        assert_eq!(call.name, "check_credit_score");
        assert_eq!(call.args["user_id"], "user_789");
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_response_parsing_text_only() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "How much would you like to borrow?" }]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        let content = response.candidates[0].content.as_ref().unwrap();

        assert_eq!(
            content.parts[0].text.as_deref(),
            Some("How much would you like to borrow?")
        );
        assert!(content.parts[0].function_call.is_none());
    }
}
