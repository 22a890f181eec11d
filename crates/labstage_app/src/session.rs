// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session controller.
//!
//! The [`Session`] ties one loaded document to its [`Stage`] and
//! [`TimelinePlayer`], keeps the lab assistant conversation, and talks to the
//! [`ServiceWorker`]. Everything here runs on the frame loop; the only
//! asynchronous work is what the worker does.
//!
//! Every generation request gets a fresh token and only the response for the
//! latest token is applied. Chat replies carry the document epoch they were
//! asked under and are dropped if another document has been loaded since.

use crate::config::{AppConfig, ChatConfig};
use crate::services::{bounded_history, reply_text, ChatRequest, ChatTurn, GenerationMode, GenerationRequest};
use crate::worker::{ServiceRequest, ServiceResponse, ServiceWorker};
use labstage_sequencer::{PlayerEvent, PlayerState, SceneDocument, TimelinePlayer, TimelineStep};
use labstage_stage::{Frame, Stage, StageSettings};
use std::sync::Arc;

/// Message shown when generation fails
pub const GENERATION_FAILED: &str = "Failed to generate simulation. Please try a different query.";

/// What the session is showing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing loaded yet
    #[default]
    Empty,
    /// Waiting for a generated document
    Generating,
    /// A document is loaded
    Ready,
    /// Last generation failed; nothing loaded
    Failed(String),
}

/// Greeting posted when a document loads
pub fn greeting(document: &SceneDocument) -> String {
    let lead = document.brief_lead();
    if lead.is_empty() {
        format!("Simulation loaded: \"{}\".", document.meta_data.title)
    } else {
        format!("Simulation loaded: \"{}\". {}.", document.meta_data.title, lead)
    }
}

/// One simulation session
pub struct Session {
    worker: ServiceWorker,
    stage_settings: StageSettings,
    chat_config: ChatConfig,
    phase: Phase,
    stage: Option<Stage>,
    player: TimelinePlayer,
    chat: Vec<ChatTurn>,
    next_token: u64,
    pending_token: Option<u64>,
    epoch: u64,
    pending_replies: usize,
}

impl Session {
    /// Create an empty session
    pub fn new(config: &AppConfig, worker: ServiceWorker) -> Self {
        Self {
            worker,
            stage_settings: config.animation.stage_settings(),
            chat_config: config.chat.clone(),
            phase: Phase::Empty,
            stage: None,
            player: TimelinePlayer::new(config.animation.rearm_policy),
            chat: Vec::new(),
            next_token: 0,
            pending_token: None,
            epoch: 0,
            pending_replies: 0,
        }
    }

    /// Ask the service for a new scene.
    ///
    /// Playback pauses and the conversation is cleared right away. Returns
    /// false for a blank query or a stopped worker.
    pub fn submit_query(&mut self, query: &str, mode: GenerationMode) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }

        self.next_token += 1;
        let token = self.next_token;
        self.player.pause();
        self.chat.clear();

        let request = GenerationRequest {
            query: query.to_string(),
            mode,
        };
        if !self.worker.submit(ServiceRequest::Generate { token, request }) {
            self.fail();
            return false;
        }

        tracing::info!(token, "Requested {} scene: '{}'", mode.as_str(), query);
        self.pending_token = Some(token);
        self.phase = Phase::Generating;
        true
    }

    /// Load a document directly, replacing whatever is loaded
    pub fn load_document(&mut self, document: Arc<SceneDocument>) {
        self.epoch += 1;
        self.pending_token = None;

        tracing::info!(
            epoch = self.epoch,
            "Loading '{}' ({} entities, {} effects, {} steps)",
            document.meta_data.title,
            document.stage_assets.len(),
            document.vfx_layer.len(),
            document.step_count()
        );

        self.stage = Some(Stage::new(Arc::clone(&document), self.stage_settings));
        self.chat = vec![ChatTurn::model(greeting(&document))];
        self.player.load(document);
        self.phase = Phase::Ready;
    }

    /// Replace the document in place, keeping the conversation
    pub fn reload_document(&mut self, document: Arc<SceneDocument>) {
        let chat = std::mem::take(&mut self.chat);
        self.load_document(document);
        self.chat = chat;
    }

    fn fail(&mut self) {
        self.epoch += 1;
        self.pending_token = None;
        self.stage = None;
        self.player.unload();
        self.phase = Phase::Failed(GENERATION_FAILED.to_string());
    }

    /// Ask the lab assistant a question about the loaded scene.
    ///
    /// Returns false when nothing is loaded or the message is blank.
    pub fn send_chat(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        let Some(document) = self.document() else {
            return false;
        };

        let request = ChatRequest {
            message: message.to_string(),
            prior_turns: bounded_history(&self.chat, self.chat_config.context_turns),
            context_brief: document.lab_assistant_config.context_brief.clone(),
        };
        self.chat.push(ChatTurn::user(message));

        if self.worker.submit(ServiceRequest::Chat {
            epoch: self.epoch,
            request,
        }) {
            self.pending_replies += 1;
        } else {
            self.chat.push(ChatTurn::model(self.chat_config.fallback_reply.clone()));
        }
        true
    }

    /// Apply every finished service response
    pub fn poll_services(&mut self) {
        for response in self.worker.poll() {
            self.apply_response(response);
        }
    }

    pub(crate) fn apply_response(&mut self, response: ServiceResponse) {
        match response {
            ServiceResponse::Generated { token, result } => {
                if self.pending_token != Some(token) {
                    tracing::warn!(token, latest = self.next_token, "Discarding stale generation response");
                    return;
                }
                match result {
                    Ok(document) => self.load_document(document),
                    Err(e) => {
                        tracing::error!("Simulation generation failed: {}", e);
                        self.fail();
                    }
                }
            }
            ServiceResponse::ChatReply { epoch, result } => {
                self.pending_replies = self.pending_replies.saturating_sub(1);
                if epoch != self.epoch {
                    tracing::warn!(epoch, current = self.epoch, "Discarding chat reply for a previous scene");
                    return;
                }
                let text = reply_text(result, &self.chat_config);
                self.chat.push(ChatTurn::model(text));
            }
        }
    }

    /// Advance one frame: service results, step timer, then the stage
    pub fn frame(&mut self, delta_time: f32) {
        self.poll_services();
        self.player.update(delta_time);
        self.sync_step();

        if let Some(stage) = &mut self.stage {
            stage.update(delta_time);
        }
    }

    fn sync_step(&mut self) {
        for event in self.player.take_events() {
            match event {
                PlayerEvent::StepChanged { from, to } => {
                    tracing::debug!("Step {} -> {}", from + 1, to + 1);
                    if self.chat_config.narrate_steps {
                        self.narrate(to);
                    }
                }
                PlayerEvent::Ended => tracing::info!("Timeline finished"),
            }
        }

        let index = self.player.index();
        if let Some(stage) = &mut self.stage {
            if stage.step_index() != index {
                stage.enter_step(index);
            }
        }
    }

    fn narrate(&mut self, index: usize) {
        let update = self
            .player
            .document()
            .and_then(|d| d.step(index))
            .map(|s| s.ui_display.chatbot_update.trim().to_string())
            .unwrap_or_default();
        if !update.is_empty() {
            self.chat.push(ChatTurn::model(update));
        }
    }

    /// Start playback
    pub fn play(&mut self) -> bool {
        self.player.play()
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.player.pause();
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        self.player.toggle();
    }

    /// Back to the first step
    pub fn restart(&mut self) {
        self.player.restart();
        self.sync_step();
    }

    /// Jump to a step
    pub fn scrub(&mut self, index: usize) {
        self.player.scrub(index);
        self.sync_step();
    }

    /// Toggle overlay labels
    pub fn toggle_labels(&mut self) {
        self.player.toggle_labels();
    }

    /// Current phase
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a generation is in flight
    pub fn is_generating(&self) -> bool {
        self.phase == Phase::Generating
    }

    /// Whether a chat reply is outstanding
    pub fn is_waiting_for_reply(&self) -> bool {
        self.pending_replies > 0
    }

    /// Loaded document
    pub fn document(&self) -> Option<&Arc<SceneDocument>> {
        self.player.document()
    }

    /// Current step
    pub fn current_step(&self) -> Option<&TimelineStep> {
        self.player.current_step()
    }

    /// Stage of the loaded document
    pub fn stage(&self) -> Option<&Stage> {
        self.stage.as_ref()
    }

    /// Mutable stage, for camera input
    pub fn stage_mut(&mut self) -> Option<&mut Stage> {
        self.stage.as_mut()
    }

    /// Timeline player
    pub fn player(&self) -> &TimelinePlayer {
        &self.player
    }

    /// Mutable timeline player, for the playback bar
    pub fn player_mut(&mut self) -> &mut TimelinePlayer {
        &mut self.player
    }

    /// Player state
    pub fn playback(&self) -> PlayerState {
        self.player.state()
    }

    /// Conversation, oldest first
    pub fn chat(&self) -> &[ChatTurn] {
        &self.chat
    }

    /// Composed frame of the loaded document
    pub fn view(&self) -> Option<Frame<'_>> {
        self.stage.as_ref().map(|stage| stage.frame(self.player.labels_visible()))
    }

    /// Document epoch; changes on every load or failure
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Name of the active service
    pub fn service_name(&self) -> &'static str {
        self.worker.service_name()
    }
}
