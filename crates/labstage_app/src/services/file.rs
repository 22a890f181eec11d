// SPDX-License-Identifier: MIT OR Apache-2.0
//! Offline backend serving a scene document from disk.

use super::{ChatRequest, GenerationRequest, SceneService, ServiceError};
use futures::future::BoxFuture;
use futures::FutureExt;
use labstage_sequencer::SceneDocument;
use std::path::PathBuf;

/// Serves the same scene file for every query and answers chat from the
/// scene's context brief.
#[derive(Debug, Clone)]
pub struct FileService {
    scene_file: Option<PathBuf>,
}

impl FileService {
    /// Serve `scene_file`; without one every generation fails
    pub fn new(scene_file: Option<PathBuf>) -> Self {
        Self { scene_file }
    }
}

impl SceneService for FileService {
    fn name(&self) -> &'static str {
        "file"
    }

    fn generate(&self, request: GenerationRequest) -> BoxFuture<'static, Result<SceneDocument, ServiceError>> {
        let path = self.scene_file.clone();
        async move {
            let path = path.ok_or_else(|| ServiceError::Unavailable("No scene file configured".to_string()))?;
            tracing::debug!("Serving {:?} for query '{}'", path, request.query);
            let text = tokio::fs::read_to_string(&path).await?;
            Ok(SceneDocument::from_json(&text)?)
        }
        .boxed()
    }

    fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<String, ServiceError>> {
        let reply = request.context_brief.trim().to_string();
        async move { Ok(reply) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::GenerationMode;

    fn request() -> GenerationRequest {
        GenerationRequest {
            query: "anything".into(),
            mode: GenerationMode::Standard,
        }
    }

    #[test]
    fn test_without_scene_file_fails() {
        let result = futures::executor::block_on(FileService::new(None).generate(request()));
        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
    }

    #[test]
    fn test_chat_echoes_brief() {
        let reply = futures::executor::block_on(FileService::new(None).chat(ChatRequest {
            message: "?".into(),
            prior_turns: Vec::new(),
            context_brief: " Light bends. ".into(),
        }))
        .unwrap();
        assert_eq!(reply, "Light bends.");
    }
}
