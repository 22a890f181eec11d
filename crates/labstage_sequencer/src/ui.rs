// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback bar rendering.
//!
//! Features:
//! - Play/pause, restart and step buttons
//! - `Step k/N` readout with the chapter title
//! - Step strip (one segment per step, width proportional to duration, click to scrub)
//! - Progress bar
//! - Label visibility toggle

use crate::player::TimelinePlayer;
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};

const STRIP_HEIGHT: f32 = 14.0;
const SEGMENT_GAP: f32 = 2.0;
const MIN_SEGMENT_WEIGHT: f32 = 0.25;

/// Colors for the step strip
#[derive(Debug, Clone, Copy)]
pub struct PlaybackBarStyle {
    /// Steps before the current one
    pub past: Color32,
    /// The current step
    pub current: Color32,
    /// Steps after the current one
    pub future: Color32,
}

impl Default for PlaybackBarStyle {
    fn default() -> Self {
        Self {
            past: Color32::from_rgb(70, 110, 160),
            current: Color32::from_rgb(100, 180, 255),
            future: Color32::from_gray(60),
        }
    }
}

/// Playback bar widget
#[derive(Debug)]
pub struct PlaybackBar {
    /// Strip colors
    pub style: PlaybackBarStyle,
    /// Whether the progress bar is drawn under the strip
    pub show_progress: bool,
}

impl PlaybackBar {
    /// Create a bar with default styling
    pub fn new() -> Self {
        Self {
            style: PlaybackBarStyle::default(),
            show_progress: true,
        }
    }

    /// Render the bar and apply user input to the player
    pub fn ui(&mut self, ui: &mut egui::Ui, player: &mut TimelinePlayer) {
        ui.add_enabled_ui(player.step_count() > 0, |ui| {
            self.render_controls(ui, player);
            self.render_strip(ui, player);
            if self.show_progress {
                ui.add(egui::ProgressBar::new(player.progress()).desired_height(4.0));
            }
        });
    }

    fn render_controls(&mut self, ui: &mut egui::Ui, player: &mut TimelinePlayer) {
        ui.horizontal(|ui| {
            let play_icon = if player.is_playing() { "⏸" } else { "▶" };
            if ui.button(play_icon).on_hover_text("Play/Pause (Space)").clicked() {
                player.toggle();
            }

            if ui.button("⏮").on_hover_text("Restart").clicked() {
                player.restart();
            }

            if ui.button("◀").on_hover_text("Previous step").clicked() {
                player.previous_step();
            }

            if ui.button("▶▶").on_hover_text("Next step").clicked() {
                player.next_step();
            }

            ui.separator();

            let count = player.step_count();
            ui.monospace(format!("Step {}/{}", (player.index() + 1).min(count), count));

            ui.separator();

            if let Some(step) = player.current_step() {
                ui.strong(step.ui_display.chapter_title.clone());
            }
            if player.at_end() && !player.is_playing() {
                ui.weak("End");
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let mut labels = player.labels_visible();
                if ui.checkbox(&mut labels, "Labels").changed() {
                    player.set_labels_visible(labels);
                }
                if let Some(remaining) = player.time_remaining() {
                    ui.weak(format!("{remaining:.1}s"));
                }
            });
        });
    }

    fn render_strip(&self, ui: &mut egui::Ui, player: &mut TimelinePlayer) {
        let weights: Vec<f32> = match player.document() {
            Some(doc) => doc
                .sync_timeline
                .iter()
                .map(|s| s.duration().max(MIN_SEGMENT_WEIGHT))
                .collect(),
            None => Vec::new(),
        };

        let (rect, response) = ui.allocate_exact_size(
            Vec2::new(ui.available_width(), STRIP_HEIGHT),
            Sense::click(),
        );
        if weights.is_empty() {
            return;
        }

        let segments = segment_rects(rect, &weights);
        let painter = ui.painter_at(rect);
        let current = player.index();

        for (i, segment) in segments.iter().enumerate() {
            let fill = match i.cmp(&current) {
                std::cmp::Ordering::Less => self.style.past,
                std::cmp::Ordering::Equal => self.style.current,
                std::cmp::Ordering::Greater => self.style.future,
            };
            painter.rect_filled(*segment, 2.0, fill);
            if response.hovered() && ui.rect_contains_pointer(*segment) {
                painter.rect_stroke(*segment, 2.0, Stroke::new(1.0, Color32::WHITE));
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Some(index) = segment_at(&segments, pos) {
                    player.scrub(index);
                }
            }
        }
    }
}

impl Default for PlaybackBar {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `rect` horizontally into one segment per weight
fn segment_rects(rect: Rect, weights: &[f32]) -> Vec<Rect> {
    let total: f32 = weights.iter().sum();
    let gaps = SEGMENT_GAP * weights.len().saturating_sub(1) as f32;
    let usable = (rect.width() - gaps).max(0.0);

    let mut x = rect.min.x;
    weights
        .iter()
        .map(|w| {
            let width = if total > 0.0 { usable * w / total } else { 0.0 };
            let segment = Rect::from_min_size(Pos2::new(x, rect.min.y), Vec2::new(width, rect.height()));
            x += width + SEGMENT_GAP;
            segment
        })
        .collect()
}

/// Index of the segment under a point, snapping gaps to the nearest segment on the left
fn segment_at(segments: &[Rect], pos: Pos2) -> Option<usize> {
    segments
        .iter()
        .rposition(|s| pos.x >= s.min.x)
        .or_else(|| (!segments.is_empty()).then_some(0))
}
