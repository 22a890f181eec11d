// SPDX-License-Identifier: MIT OR Apache-2.0
//! Top bar with the query box, mode toggle and Visualize button.

use crate::services::GenerationMode;
use crate::session::Session;
use egui::RichText;

/// Query offered on start-up
pub const DEFAULT_QUERY: &str = "Show me how a prism refracts light";

/// Query input state
pub struct TopBar {
    /// Current query text
    pub query: String,
    /// Selected generation mode
    pub mode: GenerationMode,
}

impl TopBar {
    /// Create a bar holding the default query
    pub fn new() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            mode: GenerationMode::Standard,
        }
    }

    /// Render the bar
    pub fn ui(&mut self, ui: &mut egui::Ui, session: &mut Session) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("⚛ LabStage").strong().size(18.0));
            ui.separator();

            let generating = session.is_generating();
            for mode in [GenerationMode::Standard, GenerationMode::WhatIfRemix] {
                ui.selectable_value(&mut self.mode, mode, mode.label());
            }

            let button_label = if generating { "Generating..." } else { "Visualize" };
            let button_width = 110.0;
            let response = ui.add_enabled(
                !generating,
                egui::TextEdit::singleline(&mut self.query)
                    .hint_text("Ask for any science concept...")
                    .desired_width((ui.available_width() - button_width - 16.0).max(120.0)),
            );
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let clicked = ui
                .add_enabled(
                    !generating && !self.query.trim().is_empty(),
                    egui::Button::new(button_label).min_size(egui::vec2(button_width, 0.0)),
                )
                .clicked();

            if (clicked || submitted) && !generating {
                session.submit_query(&self.query, self.mode);
            }
        });
    }
}

impl Default for TopBar {
    fn default() -> Self {
        Self::new()
    }
}
