// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene generation and lab assistant services.
//!
//! A [`SceneService`] turns a query into a [`SceneDocument`] and answers
//! questions about the loaded scene. Both operations are asynchronous and are
//! driven by the [`crate::worker::ServiceWorker`], never by the render loop.

mod file;
mod gemini;
mod prompts;

pub use file::FileService;
pub use gemini::GeminiService;

use crate::config::{Backend, ChatConfig, GenerationConfig};
use futures::future::BoxFuture;
use labstage_sequencer::{DocumentError, SceneDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Errors returned by a service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Request could not be sent or the response could not be read
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Service answered with a non-success status
    #[error("Service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
    /// Service answered without any text
    #[error("Service returned an empty response")]
    EmptyResponse,
    /// Response text is not a valid scene document
    #[error("Invalid scene document: {0}")]
    Decode(#[from] DocumentError),
    /// API key environment variable is not set
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    /// Local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Backend cannot serve this request
    #[error("{0}")]
    Unavailable(String),
}

/// Generation flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationMode {
    /// Faithful simulation of the query
    #[default]
    Standard,
    /// Counterfactual remix of the query
    WhatIfRemix,
}

impl GenerationMode {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Standard => "STANDARD",
            GenerationMode::WhatIfRemix => "WHAT_IF_REMIX",
        }
    }

    /// Label shown on the mode toggle
    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::Standard => "Standard Mode",
            GenerationMode::WhatIfRemix => "What-If Remix",
        }
    }
}

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person asking
    User,
    /// The assistant
    Model,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Author
    pub role: ChatRole,
    /// Message text
    pub text: String,
}

impl ChatTurn {
    /// A user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// An assistant message
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// A scene generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Free-text query
    pub query: String,
    /// Flavor
    pub mode: GenerationMode,
}

impl GenerationRequest {
    /// JSON payload sent as the user content
    pub fn payload(&self) -> String {
        serde_json::json!({ "user_query": self.query, "mode": self.mode }).to_string()
    }
}

/// A lab assistant question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// The new message
    pub message: String,
    /// Earlier turns, oldest first, excluding `message`
    pub prior_turns: Vec<ChatTurn>,
    /// Background for the loaded scene
    pub context_brief: String,
}

/// Backend that generates scenes and answers questions
pub trait SceneService: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Generate a scene document
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'static, Result<SceneDocument, ServiceError>>;

    /// Answer a question. Empty text means the service had nothing to say.
    fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<String, ServiceError>>;
}

/// Build the service selected by the configuration
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn SceneService>, ServiceError> {
    let service: Arc<dyn SceneService> = match config.backend {
        Backend::Gemini => Arc::new(GeminiService::from_config(config)?),
        Backend::File => Arc::new(FileService::new(config.scene_file.clone())),
    };
    tracing::info!("Using {} scene service", service.name());
    Ok(service)
}

/// Turn a chat result into the text shown to the user.
///
/// Chat never fails from the user's point of view: errors become the
/// configured fallback reply and empty answers the configured empty reply.
pub fn reply_text(result: Result<String, ServiceError>, config: &ChatConfig) -> String {
    match result {
        Ok(text) if text.trim().is_empty() => config.empty_reply.clone(),
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Chat request failed: {}", e);
            config.fallback_reply.clone()
        }
    }
}

/// Keep the last `limit` turns
pub fn bounded_history(history: &[ChatTurn], limit: usize) -> Vec<ChatTurn> {
    let start = history.len().saturating_sub(limit);
    history[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text() {
        let config = ChatConfig::default();
        assert_eq!(reply_text(Ok("Light bends.".into()), &config), "Light bends.");
        assert_eq!(reply_text(Ok("  ".into()), &config), "I'm having trouble analyzing the data right now.");
        assert_eq!(
            reply_text(Err(ServiceError::EmptyResponse), &config),
            "Connection to the Science Core interrupted."
        );
    }

    #[test]
    fn test_bounded_history() {
        let history: Vec<_> = (0..5).map(|i| ChatTurn::user(i.to_string())).collect();
        let bounded = bounded_history(&history, 2);
        assert_eq!(bounded, vec![ChatTurn::user("3"), ChatTurn::user("4")]);
        assert_eq!(bounded_history(&history, 20).len(), 5);
        assert!(bounded_history(&history, 0).is_empty());
    }

    #[test]
    fn test_generation_payload() {
        let request = GenerationRequest {
            query: "prism".into(),
            mode: GenerationMode::WhatIfRemix,
        };
        let value: serde_json::Value = serde_json::from_str(&request.payload()).unwrap();
        assert_eq!(value["user_query"], "prism");
        assert_eq!(value["mode"], "WHAT_IF_REMIX");
    }

    #[test]
    fn test_chat_role_wire_names() {
        assert_eq!(serde_json::to_string(&ChatRole::Model).unwrap(), "\"model\"");
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), "\"user\"");
    }
}
