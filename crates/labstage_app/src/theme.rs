// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dark lab theme for the window shell.

use egui::{Color32, Rounding, Stroke, Style, Visuals};

/// Palette used by the shell
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Panel background
    pub bg_primary: Color32,
    /// Window and card background
    pub bg_secondary: Color32,
    /// Widget background
    pub bg_tertiary: Color32,
    /// Body text
    pub text_primary: Color32,
    /// Accent for highlights and selections
    pub accent: Color32,
    /// Accent for hovered widgets
    pub accent_hover: Color32,
    /// Accent for pressed widgets
    pub accent_active: Color32,
    /// Borders
    pub border: Color32,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            bg_primary: Color32::from_rgb(9, 9, 11),
            bg_secondary: Color32::from_rgb(18, 18, 22),
            bg_tertiary: Color32::from_rgb(32, 32, 38),
            text_primary: Color32::from_rgb(228, 228, 231),
            accent: Color32::from_rgb(6, 182, 212),
            accent_hover: Color32::from_rgb(34, 150, 190),
            accent_active: Color32::from_rgb(14, 116, 144),
            border: Color32::from_rgb(39, 39, 42),
        }
    }
}

/// Shell theme
#[derive(Debug, Clone)]
pub struct LabTheme {
    /// Palette
    pub colors: ThemeColors,
    /// Widget corner radius
    pub widget_rounding: f32,
    /// Window corner radius
    pub panel_rounding: f32,
}

impl Default for LabTheme {
    fn default() -> Self {
        Self {
            colors: ThemeColors::default(),
            widget_rounding: 6.0,
            panel_rounding: 8.0,
        }
    }
}

impl LabTheme {
    /// egui visuals for this theme
    pub fn to_egui_visuals(&self) -> Visuals {
        let colors = &self.colors;
        let mut visuals = Visuals::dark();

        visuals.window_fill = colors.bg_secondary;
        visuals.window_stroke = Stroke::new(1.0, colors.border);
        visuals.window_rounding = Rounding::same(self.panel_rounding);
        visuals.panel_fill = colors.bg_primary;

        let widgets = [
            (&mut visuals.widgets.noninteractive, colors.bg_secondary, colors.border),
            (&mut visuals.widgets.inactive, colors.bg_tertiary, colors.border),
            (&mut visuals.widgets.hovered, colors.accent_hover, colors.accent),
            (&mut visuals.widgets.active, colors.accent_active, colors.accent),
            (&mut visuals.widgets.open, colors.accent_active, colors.accent),
        ];
        for (widget, fill, stroke) in widgets {
            widget.bg_fill = fill;
            widget.weak_bg_fill = fill;
            widget.bg_stroke = Stroke::new(1.0, stroke);
            widget.fg_stroke = Stroke::new(1.0, colors.text_primary);
            widget.rounding = Rounding::same(self.widget_rounding);
        }

        visuals.selection.bg_fill = colors.accent_active;
        visuals.selection.stroke = Stroke::new(1.0, colors.accent);
        visuals.hyperlink_color = colors.accent;
        visuals.extreme_bg_color = colors.bg_primary;
        visuals.faint_bg_color = colors.bg_tertiary;

        visuals
    }

    /// Apply to an egui context
    pub fn apply(&self, ctx: &egui::Context) {
        let style = Style {
            visuals: self.to_egui_visuals(),
            ..Style::default()
        };
        ctx.set_style(style);
    }
}
