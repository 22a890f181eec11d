// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client for a Gemini-style `generateContent` REST API.

use super::prompts::{tutor_prompt, SCENE_ENGINE_PROMPT};
use super::{ChatRequest, ChatRole, GenerationRequest, SceneService, ServiceError};
use crate::config::GenerationConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use labstage_sequencer::SceneDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationSettings>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Gemini REST backend
#[derive(Clone)]
pub struct GeminiService {
    client: reqwest::Client,
    url: Arc<str>,
    api_key: Option<Arc<str>>,
    api_key_env: Arc<str>,
}

impl GeminiService {
    /// Build a client. A missing API key is reported per request, not here.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Arc::from);
        if api_key.is_none() {
            tracing::warn!("${} is not set; generation and chat will fail", config.api_key_env);
        }

        Ok(Self {
            client,
            url: endpoint_url(&config.endpoint, &config.model).into(),
            api_key,
            api_key_env: config.api_key_env.as_str().into(),
        })
    }

    async fn generate_content(&self, body: GenerateContentRequest) -> Result<String, ServiceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::MissingApiKey(self.api_key_env.to_string()))?;

        let response = self
            .client
            .post(self.url.as_ref())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.text())
    }
}

impl SceneService for GeminiService {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn generate(&self, request: GenerationRequest) -> BoxFuture<'static, Result<SceneDocument, ServiceError>> {
        let this = self.clone();
        async move {
            let body = GenerateContentRequest {
                contents: vec![Content::text(Some("user"), request.payload())],
                system_instruction: Content::text(None, SCENE_ENGINE_PROMPT),
                generation_config: Some(GenerationSettings {
                    response_mime_type: "application/json",
                }),
            };

            let text = this.generate_content(body).await?;
            if text.trim().is_empty() {
                return Err(ServiceError::EmptyResponse);
            }
            Ok(SceneDocument::from_json(&text)?)
        }
        .boxed()
    }

    fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<String, ServiceError>> {
        let this = self.clone();
        async move {
            let body = GenerateContentRequest {
                contents: chat_contents(&request),
                system_instruction: Content::text(None, tutor_prompt(&request.context_brief)),
                generation_config: None,
            };
            this.generate_content(body).await
        }
        .boxed()
    }
}

fn endpoint_url(endpoint: &str, model: &str) -> String {
    format!("{}/models/{}:generateContent", endpoint.trim_end_matches('/'), model)
}

fn chat_contents(request: &ChatRequest) -> Vec<Content> {
    request
        .prior_turns
        .iter()
        .map(|turn| {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            Content::text(Some(role), turn.text.as_str())
        })
        .chain(std::iter::once(Content::text(Some("user"), request.message.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ChatTurn, GenerationMode};
    use serde_json::json;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("https://example.test/v1beta/", "gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_generation_body_shape() {
        let request = GenerationRequest {
            query: "prism".into(),
            mode: GenerationMode::Standard,
        };
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), request.payload())],
            system_instruction: Content::text(None, SCENE_ENGINE_PROMPT),
            generation_config: Some(GenerationSettings {
                response_mime_type: "application/json",
            }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
    }

    #[test]
    fn test_chat_contents_end_with_message() {
        let request = ChatRequest {
            message: "Why?".into(),
            prior_turns: vec![ChatTurn::model("Hello"), ChatTurn::user("Hi")],
            context_brief: String::new(),
        };
        let contents = chat_contents(&request);
        let roles: Vec<_> = contents.iter().map(|c| c.role.as_deref().unwrap()).collect();
        assert_eq!(roles, ["model", "user", "user"]);
        assert_eq!(contents[2].parts[0].text, "Why?");
    }

    #[test]
    fn test_response_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text(), "{\"a\":1}");

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.text(), "");
    }
}
