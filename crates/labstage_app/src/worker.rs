// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background worker that runs service requests off the render thread.
//!
//! Requests go in over an unbounded channel; each one is spawned as its own
//! task on a current-thread Tokio runtime so a slow generation never holds up
//! a chat reply. Results come back over a second channel that the frame loop
//! drains without blocking.

use crate::services::{ChatRequest, GenerationRequest, SceneService, ServiceError};
use labstage_sequencer::SceneDocument;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Work submitted to the worker
#[derive(Debug, Clone)]
pub enum ServiceRequest {
    /// Generate a scene; `token` identifies the request
    Generate {
        /// Request token
        token: u64,
        /// Query and mode
        request: GenerationRequest,
    },
    /// Ask the assistant; `epoch` is the document epoch it was asked under
    Chat {
        /// Document epoch
        epoch: u64,
        /// Message and context
        request: ChatRequest,
    },
}

/// Result delivered back to the frame loop
#[derive(Debug)]
pub enum ServiceResponse {
    /// Scene generation finished
    Generated {
        /// Token of the originating request
        token: u64,
        /// Parsed document or failure
        result: Result<Arc<SceneDocument>, ServiceError>,
    },
    /// Chat finished
    ChatReply {
        /// Epoch of the originating request
        epoch: u64,
        /// Reply text or failure
        result: Result<String, ServiceError>,
    },
}

/// Handle to the background service thread
pub struct ServiceWorker {
    request_tx: mpsc::UnboundedSender<ServiceRequest>,
    result_rx: mpsc::UnboundedReceiver<ServiceResponse>,
    service_name: &'static str,
}

impl ServiceWorker {
    /// Spawn the worker thread for a service
    pub fn spawn(service: Arc<dyn SceneService>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let service_name = service.name();

        std::thread::Builder::new()
            .name("labstage-services".to_string())
            .spawn(move || service_worker(service, request_rx, result_tx))?;

        Ok(Self {
            request_tx,
            result_rx,
            service_name,
        })
    }

    /// Queue a request. Returns false if the worker has stopped.
    pub fn submit(&self, request: ServiceRequest) -> bool {
        if self.request_tx.send(request).is_err() {
            tracing::error!("Service worker is not running");
            return false;
        }
        true
    }

    /// Drain finished results (non-blocking)
    pub fn poll(&mut self) -> Vec<ServiceResponse> {
        let mut responses = Vec::new();
        while let Ok(response) = self.result_rx.try_recv() {
            responses.push(response);
        }
        responses
    }

    /// Name of the service behind this worker
    pub fn service_name(&self) -> &'static str {
        self.service_name
    }
}

fn service_worker(
    service: Arc<dyn SceneService>,
    mut request_rx: mpsc::UnboundedReceiver<ServiceRequest>,
    result_tx: mpsc::UnboundedSender<ServiceResponse>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create service runtime: {}", e);
            return;
        }
    };

    rt.block_on(async move {
        while let Some(request) = request_rx.recv().await {
            let service = Arc::clone(&service);
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                let response = run_request(service.as_ref(), request).await;
                // Receiver gone means the app is shutting down
                let _ = result_tx.send(response);
            });
        }
    });
    tracing::debug!("Service worker stopped");
}

async fn run_request(service: &dyn SceneService, request: ServiceRequest) -> ServiceResponse {
    match request {
        ServiceRequest::Generate { token, request } => {
            tracing::info!(token, mode = request.mode.as_str(), "Generating scene for '{}'", request.query);
            let result = service.generate(request).await.map(Arc::new);
            ServiceResponse::Generated { token, result }
        }
        ServiceRequest::Chat { epoch, request } => {
            tracing::debug!(epoch, turns = request.prior_turns.len(), "Sending chat message");
            let result = service.chat(request).await;
            ServiceResponse::ChatReply { epoch, result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::GenerationMode;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::time::{Duration, Instant};

    /// Slow generation, instant chat
    struct SlowGeneration;

    impl SceneService for SlowGeneration {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn generate(&self, _request: GenerationRequest) -> BoxFuture<'static, Result<SceneDocument, ServiceError>> {
            async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Err(ServiceError::EmptyResponse)
            }
            .boxed()
        }

        fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<String, ServiceError>> {
            async move { Ok(format!("re: {}", request.message)) }.boxed()
        }
    }

    fn wait_for(worker: &mut ServiceWorker, count: usize) -> Vec<ServiceResponse> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut responses = Vec::new();
        while responses.len() < count && Instant::now() < deadline {
            responses.extend(worker.poll());
            std::thread::sleep(Duration::from_millis(5));
        }
        responses
    }

    #[test]
    fn test_chat_not_blocked_by_generation() {
        let mut worker = ServiceWorker::spawn(Arc::new(SlowGeneration)).unwrap();
        assert_eq!(worker.service_name(), "slow");

        assert!(worker.submit(ServiceRequest::Generate {
            token: 1,
            request: GenerationRequest {
                query: "prism".into(),
                mode: GenerationMode::Standard,
            },
        }));
        assert!(worker.submit(ServiceRequest::Chat {
            epoch: 3,
            request: ChatRequest {
                message: "hello".into(),
                prior_turns: Vec::new(),
                context_brief: String::new(),
            },
        }));

        let responses = wait_for(&mut worker, 2);
        assert_eq!(responses.len(), 2);
        match &responses[0] {
            ServiceResponse::ChatReply { epoch, result } => {
                assert_eq!(*epoch, 3);
                assert_eq!(result.as_deref().unwrap(), "re: hello");
            }
            other => panic!("expected chat first, got {other:?}"),
        }
        assert!(matches!(
            responses[1],
            ServiceResponse::Generated { token: 1, result: Err(ServiceError::EmptyResponse) }
        ));
    }

    #[test]
    fn test_poll_is_non_blocking() {
        let mut worker = ServiceWorker::spawn(Arc::new(SlowGeneration)).unwrap();
        assert!(worker.poll().is_empty());
    }
}
