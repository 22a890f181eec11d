// SPDX-License-Identifier: MIT OR Apache-2.0
//! Windowless frame loop.
//!
//! Drives a session at a fixed frame rate without rendering, logging each
//! step as it becomes current. Useful for checking generated scenes from a
//! terminal or in CI.

use crate::session::{Phase, Session};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Reasons a headless run has nothing to play
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeadlessError {
    /// Generation did not finish within the timeout
    #[error("Timed out waiting for scene generation")]
    TimedOut,
    /// Generation finished with an error
    #[error("{0}")]
    GenerationFailed(String),
    /// Neither a scene file nor a query was given
    #[error("No scene loaded; pass --scene or --query")]
    NothingLoaded,
}

/// Headless run parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessOptions {
    /// Number of frames to simulate
    pub frames: u32,
    /// Simulated frames per second
    pub fps: f32,
    /// How long to wait for a pending generation
    pub generation_timeout: Duration,
}

/// What a headless run ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessSummary {
    /// Frames simulated
    pub frames: u32,
    /// Step index at the end
    pub final_step: usize,
    /// Every step index that was current, in order of first appearance
    pub visited: Vec<usize>,
    /// Live particles in the last frame
    pub particles: usize,
}

/// Block until a pending generation finishes or times out
pub fn wait_for_generation(session: &mut Session, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while session.is_generating() {
        if Instant::now() >= deadline {
            tracing::error!("Timed out waiting for scene generation");
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
        session.poll_services();
    }
    matches!(session.phase(), Phase::Ready)
}

/// Play the loaded document from the start for a fixed number of frames
pub fn run(session: &mut Session, options: HeadlessOptions) -> Result<HeadlessSummary, HeadlessError> {
    if session.is_generating() && !wait_for_generation(session, options.generation_timeout) {
        return Err(HeadlessError::TimedOut);
    }
    if let Phase::Failed(message) = session.phase() {
        return Err(HeadlessError::GenerationFailed(message.clone()));
    }
    let document = session.document().ok_or(HeadlessError::NothingLoaded)?.clone();

    tracing::info!(
        "Headless run of '{}': {} frames at {} fps",
        document.meta_data.title,
        options.frames,
        options.fps
    );

    let delta_time = 1.0 / options.fps.max(1.0);
    session.restart();
    session.play();

    let mut visited = vec![session.player().index()];
    log_step(session);

    for _ in 0..options.frames {
        session.frame(delta_time);
        let index = session.player().index();
        if visited.last() != Some(&index) {
            visited.push(index);
            log_step(session);
        }
    }

    let summary = HeadlessSummary {
        frames: options.frames,
        final_step: session.player().index(),
        visited,
        particles: session.view().map_or(0, |frame| frame.particle_count()),
    };
    tracing::info!(
        "Finished at step {}/{} ({:?}), {} live particles",
        summary.final_step + 1,
        session.player().step_count(),
        session.playback(),
        summary.particles
    );
    Ok(summary)
}

fn log_step(session: &Session) {
    let player = session.player();
    if let Some(step) = player.current_step() {
        tracing::info!(
            "Step {}/{}: {}",
            player.index() + 1,
            player.step_count(),
            step.ui_display.chapter_title
        );
    }
}
