// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene-wide lighting and backdrop.

use fastrand::Rng;
use labstage_sequencer::{Rgb, VisualSettings};

/// Number of stars drawn for dark presets
pub const STAR_COUNT: usize = 5000;
/// Inner radius of the starfield shell
pub const STAR_RADIUS: f32 = 100.0;
/// Thickness of the starfield shell
pub const STAR_DEPTH: f32 = 50.0;

const DARK_BACKGROUND: Rgb = Rgb([5.0 / 255.0; 3]);
const STUDIO_BACKGROUND: Rgb = Rgb([26.0 / 255.0; 3]);

/// Image-based lighting preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingPreset {
    /// Neutral studio lighting
    Studio,
    /// City lighting
    City,
}

/// Fixed spot light that keys the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyLight {
    /// World position
    pub position: [f32; 3],
    /// Cone angle in radians
    pub angle: f32,
    /// Edge softness in [0, 1]
    pub penumbra: f32,
    /// Intensity
    pub intensity: f32,
}

impl Default for KeyLight {
    fn default() -> Self {
        Self {
            position: [10.0, 10.0, 10.0],
            angle: 0.15,
            penumbra: 1.0,
            intensity: 1.0,
        }
    }
}

/// Resolved environment for a document
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    /// Authored preset name
    pub preset: String,
    /// Clear color
    pub background: Rgb,
    /// Ambient light intensity
    pub ambient: f32,
    /// Number of background stars (0 for none)
    pub star_count: usize,
    /// Image-based lighting
    pub lighting: LightingPreset,
    /// Key light
    pub key_light: KeyLight,
    /// Bloom strength
    pub bloom: f32,
    /// Whether to darken the viewport corners
    pub vignette: bool,
}

impl Environment {
    /// Resolve the environment for a preset.
    ///
    /// `night` and `space` are dark with a starfield; every other preset is a
    /// grey studio backdrop. Only `night` switches image lighting to the city
    /// preset.
    pub fn from_settings(settings: &VisualSettings) -> Self {
        let preset = settings.environment_preset.trim().to_ascii_lowercase();
        let dark = matches!(preset.as_str(), "night" | "space");

        Self {
            background: if dark { DARK_BACKGROUND } else { STUDIO_BACKGROUND },
            ambient: if dark { 0.2 } else { 0.5 },
            star_count: if dark { STAR_COUNT } else { 0 },
            lighting: if preset == "night" { LightingPreset::City } else { LightingPreset::Studio },
            key_light: KeyLight::default(),
            bloom: settings.post_processing.bloom_intensity,
            vignette: settings.post_processing.vignette,
            preset,
        }
    }

    /// Whether the preset is one of the dark ones
    pub fn is_dark(&self) -> bool {
        self.star_count > 0
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_settings(&VisualSettings::default())
    }
}

/// Star positions on a spherical shell, deterministic for a seed
pub fn starfield(count: usize, seed: u64) -> Vec<[f32; 3]> {
    let mut rng = Rng::with_seed(seed);
    (0..count)
        .map(|_| {
            let radius = STAR_RADIUS + rng.f32() * STAR_DEPTH;
            let theta = rng.f32() * std::f32::consts::TAU;
            let cos_phi = rng.f32() * 2.0 - 1.0;
            let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
            [
                radius * sin_phi * theta.cos(),
                radius * cos_phi,
                radius * sin_phi * theta.sin(),
            ]
        })
        .collect()
}
