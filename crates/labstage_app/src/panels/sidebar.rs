// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sidebar with the title card and the current step's explanation.

use crate::session::Session;
use egui::{Color32, RichText};
use labstage_sequencer::MetaData;

/// Badge text and color for a title card
pub fn verdict_badge(meta: &MetaData) -> (&'static str, Color32) {
    if meta.is_remix {
        ("WHAT-IF REMIX", Color32::from_rgb(200, 120, 255))
    } else {
        ("VERIFIED SCIENCE", Color32::from_rgb(90, 210, 160))
    }
}

/// Render the sidebar
pub fn sidebar_ui(ui: &mut egui::Ui, session: &Session) {
    ui.label(RichText::new("Scientific Context").small().weak());
    ui.add_space(4.0);

    let Some(document) = session.document() else {
        ui.label(RichText::new("No simulation loaded.").weak().italics());
        return;
    };

    let meta = &document.meta_data;
    ui.heading(&meta.title);

    let (badge, tint) = verdict_badge(meta);
    ui.horizontal_wrapped(|ui| {
        egui::Frame::none()
            .stroke(egui::Stroke::new(1.0, tint))
            .rounding(4.0)
            .inner_margin(egui::Margin::symmetric(6.0, 2.0))
            .show(ui, |ui| {
                ui.label(RichText::new(badge).small().strong().color(tint));
            });
    });
    if !meta.scientific_verdict.is_empty() {
        ui.label(RichText::new(&meta.scientific_verdict).italics());
    }

    ui.separator();

    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        if let Some(step) = session.current_step() {
            let player = session.player();
            ui.label(
                RichText::new(format!("STEP {} OF {}", player.index() + 1, player.step_count()))
                    .small()
                    .monospace()
                    .color(Color32::from_rgb(100, 180, 255)),
            );
            ui.label(RichText::new(&step.ui_display.chapter_title).strong().size(16.0));
            ui.add_space(4.0);
            ui.label(&step.ui_display.sidebar_explanation);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_badge() {
        let mut meta = MetaData::default();
        assert_eq!(verdict_badge(&meta).0, "VERIFIED SCIENCE");
        meta.is_remix = true;
        assert_eq!(verdict_badge(&meta).0, "WHAT-IF REMIX");
    }
}
