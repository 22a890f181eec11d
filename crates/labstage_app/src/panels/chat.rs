// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lab assistant chat panel.

use crate::services::ChatRole;
use crate::session::Session;
use egui::{Color32, RichText};
use labstage_sequencer::SceneDocument;

/// Name shown when the document does not name its assistant
pub const DEFAULT_BOT_NAME: &str = "Omni-Bot";

/// Assistant name for a document
pub fn bot_name(document: Option<&SceneDocument>) -> &str {
    document
        .map(|d| d.lab_assistant_config.bot_name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_BOT_NAME)
}

/// Chat with the lab assistant about the loaded scene
pub struct ChatPanel {
    input: String,
}

impl ChatPanel {
    /// Create an empty chat panel
    pub fn new() -> Self {
        Self { input: String::new() }
    }

    /// Render the panel
    pub fn ui(&mut self, ui: &mut egui::Ui, session: &mut Session) {
        let document = session.document().cloned();
        let name = bot_name(document.as_deref()).to_string();

        ui.horizontal(|ui| {
            ui.label(RichText::new("🤖").size(18.0));
            ui.label(RichText::new(&name).strong());
            if session.is_waiting_for_reply() {
                ui.spinner();
            }
        });
        ui.separator();

        let input_height = 64.0;
        let suggestions_height = if document.is_some() { 80.0 } else { 0.0 };
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .max_height((ui.available_height() - input_height - suggestions_height).max(60.0))
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if session.chat().is_empty() {
                    ui.label(RichText::new("Generate a simulation to start chatting.").weak().italics());
                }
                for turn in session.chat() {
                    render_turn(ui, turn.role, &turn.text, &name);
                }
                if session.is_waiting_for_reply() {
                    ui.label(RichText::new(format!("{name} is typing...")).weak().italics());
                }
            });

        let mut outgoing = None;
        if let Some(document) = &document {
            let questions = &document.lab_assistant_config.suggested_questions;
            if !questions.is_empty() {
                ui.separator();
                ui.label(RichText::new("Suggested").small().weak());
                ui.horizontal_wrapped(|ui| {
                    for question in questions {
                        if ui.small_button(question).clicked() {
                            outgoing = Some(question.clone());
                        }
                    }
                });
            }
        }

        ui.separator();
        ui.add_enabled_ui(document.is_some(), |ui| {
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.input)
                        .hint_text("Ask about the simulation...")
                        .desired_width(ui.available_width() - 60.0),
                );
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if (ui.button("Send").clicked() || submitted) && !self.input.trim().is_empty() {
                    outgoing = Some(std::mem::take(&mut self.input));
                }
            });
        });

        if let Some(message) = outgoing {
            session.send_chat(&message);
        }
    }
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn render_turn(ui: &mut egui::Ui, role: ChatRole, text: &str, bot_name: &str) {
    let (author, fill, layout) = match role {
        ChatRole::User => ("You", Color32::from_rgb(30, 70, 120), egui::Layout::right_to_left(egui::Align::TOP)),
        ChatRole::Model => (bot_name, Color32::from_gray(40), egui::Layout::left_to_right(egui::Align::TOP)),
    };

    ui.with_layout(layout, |ui| {
        egui::Frame::none()
            .fill(fill)
            .rounding(8.0)
            .inner_margin(egui::Margin::symmetric(10.0, 6.0))
            .show(ui, |ui| {
                ui.set_max_width(ui.available_width() * 0.85);
                ui.vertical(|ui| {
                    ui.label(RichText::new(author).small().weak());
                    ui.label(text);
                });
            });
    });
    ui.add_space(4.0);
}
