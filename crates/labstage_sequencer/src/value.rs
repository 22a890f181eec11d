// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target values, colors and interpolation helpers.

use serde::{Deserialize, Serialize};

/// Linear RGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    /// Pure white
    pub const WHITE: Rgb = Rgb([1.0, 1.0, 1.0]);

    /// Parse `#rrggbb` or `#rgb` (the leading `#` is optional)
    pub fn from_hex(text: &str) -> Option<Rgb> {
        let hex = text.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Rgb([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            3 => {
                let expand = |i: usize| {
                    let digit = &hex[i..i + 1];
                    channel(&format!("{digit}{digit}"))
                };
                Some(Rgb([expand(0)?, expand(1)?, expand(2)?]))
            }
            _ => None,
        }
    }

    /// Format as `#rrggbb`
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_u8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Components quantized to bytes
    pub fn to_u8(&self) -> [u8; 3] {
        self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Multiply every component by a factor
    pub fn scaled(&self, factor: f32) -> Rgb {
        Rgb(self.0.map(|c| (c * factor).clamp(0.0, 1.0)))
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A typed action target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetValue {
    /// Numeric triple (position, scale or Euler angles)
    Vec3([f32; 3]),
    /// Color
    Color(Rgb),
}

impl TargetValue {
    /// Resolve a raw `target_value`.
    ///
    /// Accepts a JSON array of three numbers, a hex color string, or a string
    /// holding a JSON array. Returns `None` for anything else.
    pub fn parse(raw: &serde_json::Value) -> Option<TargetValue> {
        match raw {
            serde_json::Value::Array(items) => vec3_from_array(items).map(TargetValue::Vec3),
            serde_json::Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.starts_with('[') {
                    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
                    match value {
                        serde_json::Value::Array(items) => {
                            vec3_from_array(&items).map(TargetValue::Vec3)
                        }
                        _ => None,
                    }
                } else {
                    Rgb::from_hex(trimmed).map(TargetValue::Color)
                }
            }
            _ => None,
        }
    }
}

fn vec3_from_array(items: &[serde_json::Value]) -> Option<[f32; 3]> {
    if items.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        let v = item.as_f64()?;
        if !v.is_finite() {
            return None;
        }
        *slot = v as f32;
    }
    Some(out)
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Interpolate Vec3
    pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
        [
            Self::lerp(a[0], b[0], t),
            Self::lerp(a[1], b[1], t),
            Self::lerp(a[2], b[2], t),
        ]
    }

    /// Interpolate colors component-wise
    pub fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
        Rgb(Self::lerp_vec3(a.0, b.0, t))
    }

    /// Smoothing factor that halves the remaining distance every `half_life` seconds
    pub fn half_life_alpha(dt: f32, half_life: f32) -> f32 {
        if half_life <= 0.0 {
            return 1.0;
        }
        1.0 - 0.5_f32.powf(dt.max(0.0) / half_life)
    }

    /// Largest per-component distance between two triples
    pub fn max_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }
}
