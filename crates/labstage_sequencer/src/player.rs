// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step timeline playback.
//!
//! The [`TimelinePlayer`] is a discrete state machine over the steps of one
//! [`SceneDocument`]. It owns the current step index and a logical step timer
//! that is advanced by the frame loop through [`TimelinePlayer::update`]; the
//! timer only ever mutates the index.

use crate::document::{SceneDocument, TimelineStep};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// No document loaded
    #[default]
    Idle,
    /// Document loaded, timer not running
    Paused,
    /// Timer running
    Playing,
}

/// What happens to an armed timer when the index changes while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RearmPolicy {
    /// Scrub and restart leave the armed timer untouched
    #[default]
    KeepInFlight,
    /// Any index change while playing re-arms with the new step's duration
    RearmOnIndexChange,
}

/// Observable playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    /// Current step index
    pub index: usize,
    /// Whether the timer is running
    pub playing: bool,
    /// Whether overlay labels are shown
    pub labels_visible: bool,
}

/// Notification produced by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The current step changed
    StepChanged {
        /// Previous index
        from: usize,
        /// New index
        to: usize,
    },
    /// The timer fired on the last step and playback paused
    Ended,
}

#[derive(Debug, Clone, Copy)]
struct StepTimer {
    interval: f32,
    elapsed: f32,
}

impl StepTimer {
    fn armed(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            elapsed: 0.0,
        }
    }
}

/// Playback controller for a step timeline
#[derive(Debug)]
pub struct TimelinePlayer {
    document: Option<Arc<SceneDocument>>,
    state: PlayerState,
    index: usize,
    timer: Option<StepTimer>,
    labels_visible: bool,
    rearm_policy: RearmPolicy,
    pending_events: Vec<PlayerEvent>,
}

impl TimelinePlayer {
    /// Create an idle player
    pub fn new(rearm_policy: RearmPolicy) -> Self {
        Self {
            document: None,
            state: PlayerState::Idle,
            index: 0,
            timer: None,
            labels_visible: true,
            rearm_policy,
            pending_events: Vec::new(),
        }
    }

    /// Load a document: paused at the first step
    pub fn load(&mut self, document: Arc<SceneDocument>) {
        tracing::info!(
            "Timeline loaded: '{}' ({} steps)",
            document.meta_data.title,
            document.step_count()
        );
        self.document = Some(document);
        self.state = PlayerState::Paused;
        self.index = 0;
        self.timer = None;
        self.pending_events.clear();
    }

    /// Replace the document; identical to [`Self::load`]
    pub fn reload(&mut self, document: Arc<SceneDocument>) {
        self.load(document);
    }

    /// Drop the document and return to idle
    pub fn unload(&mut self) {
        self.document = None;
        self.state = PlayerState::Idle;
        self.index = 0;
        self.timer = None;
        self.pending_events.clear();
    }

    /// Start the step timer. Returns whether playback started.
    pub fn play(&mut self) -> bool {
        if self.state != PlayerState::Paused {
            return false;
        }
        let Some(duration) = self.current_step().map(TimelineStep::duration) else {
            tracing::warn!("Cannot play an empty timeline");
            return false;
        };
        self.timer = Some(StepTimer::armed(duration));
        self.state = PlayerState::Playing;
        true
    }

    /// Stop the step timer
    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
            self.timer = None;
        }
    }

    /// Toggle play/pause
    pub fn toggle(&mut self) {
        match self.state {
            PlayerState::Playing => self.pause(),
            PlayerState::Paused => {
                self.play();
            }
            PlayerState::Idle => {}
        }
    }

    /// Jump to the first step, keeping the current play/pause mode
    pub fn restart(&mut self) {
        self.set_index(0);
    }

    /// Jump to a step. The index is clamped to the timeline.
    pub fn scrub(&mut self, index: usize) {
        self.set_index(index);
    }

    /// Jump one step forward
    pub fn next_step(&mut self) {
        self.set_index(self.index.saturating_add(1));
    }

    /// Jump one step back
    pub fn previous_step(&mut self) {
        self.set_index(self.index.saturating_sub(1));
    }

    fn set_index(&mut self, index: usize) {
        if self.state == PlayerState::Idle {
            return;
        }
        let clamped = index.min(self.last_index());
        if clamped == self.index {
            return;
        }

        let from = self.index;
        self.index = clamped;
        self.pending_events.push(PlayerEvent::StepChanged { from, to: clamped });

        if self.state == PlayerState::Playing && self.rearm_policy == RearmPolicy::RearmOnIndexChange {
            self.timer = Some(StepTimer::armed(self.current_duration()));
        }
    }

    /// Advance the step timer by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        if self.state != PlayerState::Playing {
            return;
        }
        let Some(mut timer) = self.timer.take() else {
            return;
        };
        timer.elapsed += delta_time.max(0.0);

        while timer.elapsed >= timer.interval {
            timer.elapsed -= timer.interval;

            if self.index >= self.last_index() {
                tracing::debug!("Timeline finished at step {}", self.index + 1);
                self.state = PlayerState::Paused;
                self.pending_events.push(PlayerEvent::Ended);
                return;
            }

            let from = self.index;
            self.index += 1;
            self.pending_events.push(PlayerEvent::StepChanged { from, to: self.index });
            timer.interval = self.current_duration();
        }

        self.timer = Some(timer);
    }

    /// Get pending events and clear them
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Toggle overlay label visibility
    pub fn toggle_labels(&mut self) {
        self.labels_visible = !self.labels_visible;
    }

    /// Set overlay label visibility
    pub fn set_labels_visible(&mut self, visible: bool) {
        self.labels_visible = visible;
    }

    /// Current state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether the timer is running
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    /// Current step index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether overlay labels are shown
    pub fn labels_visible(&self) -> bool {
        self.labels_visible
    }

    /// Snapshot of index, play flag and label flag
    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            index: self.index,
            playing: self.is_playing(),
            labels_visible: self.labels_visible,
        }
    }

    /// Loaded document
    pub fn document(&self) -> Option<&Arc<SceneDocument>> {
        self.document.as_ref()
    }

    /// Number of steps in the loaded document
    pub fn step_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.step_count())
    }

    /// Current step
    pub fn current_step(&self) -> Option<&TimelineStep> {
        self.document.as_ref().and_then(|d| d.step(self.index))
    }

    /// Whether the current step is the last one
    pub fn at_end(&self) -> bool {
        self.state != PlayerState::Idle && self.index >= self.last_index()
    }

    /// Fraction of the timeline reached, `(index + 1) / N`
    pub fn progress(&self) -> f32 {
        match self.step_count() {
            0 => 0.0,
            n => (self.index + 1) as f32 / n as f32,
        }
    }

    /// Seconds left on the armed timer
    pub fn time_remaining(&self) -> Option<f32> {
        self.timer.map(|t| (t.interval - t.elapsed).max(0.0))
    }

    fn last_index(&self) -> usize {
        self.step_count().saturating_sub(1)
    }

    fn current_duration(&self) -> f32 {
        self.current_step().map_or(0.0, TimelineStep::duration)
    }
}

impl Default for TimelinePlayer {
    fn default() -> Self {
        Self::new(RearmPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::three_step_document;

    fn loaded(policy: RearmPolicy) -> TimelinePlayer {
        let mut player = TimelinePlayer::new(policy);
        player.load(three_step_document());
        player
    }

    #[test]
    fn test_idle_operations_are_noops() {
        let mut player = TimelinePlayer::default();
        assert!(!player.play());
        player.scrub(2);
        player.restart();
        player.update(5.0);
        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(player.index(), 0);
        assert!(player.take_events().is_empty());
        assert_eq!(player.progress(), 0.0);
    }

    #[test]
    fn test_scrub_shows_each_step() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        let titles = ["Light enters", "Refraction", "Spectrum"];
        for (i, title) in titles.iter().enumerate() {
            player.scrub(i);
            assert_eq!(player.index(), i);
            assert_eq!(player.current_step().unwrap().ui_display.chapter_title, *title);
        }
        player.scrub(99);
        assert_eq!(player.index(), 2);
        assert_eq!(player.state(), PlayerState::Paused);
    }

    #[test]
    fn test_restart_from_any_state() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.scrub(2);
        player.restart();
        assert_eq!(player.index(), 0);
        assert_eq!(player.state(), PlayerState::Paused);

        player.scrub(1);
        player.play();
        player.restart();
        assert_eq!(player.index(), 0);
        assert!(player.is_playing());
    }

    #[test]
    fn test_play_at_last_step_pauses_without_advancing() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.scrub(2);
        player.take_events();
        assert!(player.play());
        player.update(0.5);
        assert!(player.is_playing());
        player.update(0.6);
        assert_eq!(player.state(), PlayerState::Paused);
        assert_eq!(player.index(), 2);
        assert_eq!(player.take_events(), vec![PlayerEvent::Ended]);
        assert!(player.time_remaining().is_none());
    }

    #[test]
    fn test_end_to_end_durations() {
        // durations [2, 3, 1]
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.play();

        let mut t = 0.0;
        let mut seen = Vec::new();
        while t < 6.5 {
            player.update(0.25);
            t += 0.25;
            seen.push((t, player.index(), player.state()));
        }

        let at = |time: f32| seen.iter().find(|(t, _, _)| (*t - time).abs() < 1e-4).copied().unwrap();
        assert_eq!(at(1.75).1, 0);
        assert_eq!(at(2.0).1, 1);
        assert_eq!(at(4.75).1, 1);
        assert_eq!(at(5.0).1, 2);
        assert_eq!(at(5.75).2, PlayerState::Playing);
        assert_eq!(at(6.0).1, 2);
        assert_eq!(at(6.0).2, PlayerState::Paused);
    }

    #[test]
    fn test_pause_cancels_timer() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.play();
        player.update(1.5);
        player.pause();
        assert!(player.time_remaining().is_none());
        player.update(10.0);
        assert_eq!(player.index(), 0);

        // A fresh play arms a full duration again
        player.play();
        assert_eq!(player.time_remaining(), Some(2.0));
        player.update(1.5);
        assert_eq!(player.index(), 0);
    }

    #[test]
    fn test_keep_in_flight_ignores_scrub() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.play();
        player.update(1.0);
        player.scrub(1);
        // Timer armed with step 0's 2s, 1s left
        assert_eq!(player.time_remaining(), Some(1.0));
        player.update(1.0);
        assert_eq!(player.index(), 2);
    }

    #[test]
    fn test_rearm_on_index_change() {
        let mut player = loaded(RearmPolicy::RearmOnIndexChange);
        player.play();
        player.update(1.0);
        player.scrub(1);
        assert_eq!(player.time_remaining(), Some(3.0));
        player.update(2.5);
        assert_eq!(player.index(), 1);
        player.update(0.5);
        assert_eq!(player.index(), 2);
    }

    #[test]
    fn test_events_and_progress() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.next_step();
        player.next_step();
        player.previous_step();
        assert_eq!(
            player.take_events(),
            vec![
                PlayerEvent::StepChanged { from: 0, to: 1 },
                PlayerEvent::StepChanged { from: 1, to: 2 },
                PlayerEvent::StepChanged { from: 2, to: 1 },
            ]
        );
        assert!((player.progress() - 2.0 / 3.0).abs() < 1e-6);
        player.toggle_labels();
        assert_eq!(
            player.playback_state(),
            PlaybackState { index: 1, playing: false, labels_visible: false }
        );
    }

    #[test]
    fn test_reload_resets() {
        let mut player = loaded(RearmPolicy::KeepInFlight);
        player.scrub(2);
        player.play();
        player.reload(three_step_document());
        assert_eq!(player.index(), 0);
        assert_eq!(player.state(), PlayerState::Paused);
        assert!(player.take_events().is_empty());
    }
}
