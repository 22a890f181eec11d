// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene document model.
//!
//! A [`SceneDocument`] is the complete generated description of one
//! simulation: presentation settings, the entities on stage, particle effect
//! layers, 2D overlays and the narrated timeline. Documents are immutable once
//! received and are shared as `Arc<SceneDocument>`; a new generation replaces
//! the whole document.
//!
//! Field names follow the wire format emitted by the generation service.
//! Enumerated strings that the renderer does not recognise deserialize to an
//! `Unknown` variant instead of failing, so an unexpected geometry or effect
//! name degrades to a default visual.

use crate::value::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while reading a scene document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The text is not a structurally valid document
    #[error("Invalid scene document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Title card and verdict for a simulation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaData {
    /// Simulation title
    pub title: String,
    /// One-line scientific verdict shown under the title
    #[serde(default)]
    pub scientific_verdict: String,
    /// Whether this is a "what if" remix rather than a factual scene
    #[serde(default)]
    pub is_remix: bool,
}

/// Post-processing hints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostProcessing {
    /// Bloom strength
    #[serde(default)]
    pub bloom_intensity: f32,
    /// Whether to darken the viewport corners
    #[serde(default)]
    pub vignette: bool,
}

/// Scene-wide presentation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualSettings {
    /// Named environment preset (studio, city, night, forest, space)
    #[serde(default)]
    pub environment_preset: String,
    /// Post-processing hints
    #[serde(default)]
    pub post_processing: PostProcessing,
}

/// Configuration for the contextual chat assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabAssistantConfig {
    /// Display name of the assistant
    #[serde(default)]
    pub bot_name: String,
    /// Context handed to the assistant with every question
    #[serde(default)]
    pub context_brief: String,
    /// Questions offered to the user as shortcuts
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Geometric kind of a stage entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Unit sphere
    Sphere,
    /// Unit cube
    Cube,
    /// Cylinder of radius 1 and height 2
    Cylinder,
    /// External model (drawn as a low-detail sphere)
    GlbAsset,
    /// Anything else
    #[serde(other)]
    Unknown,
}

/// Authored transform of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world units
    pub position: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
    /// Euler rotation in radians (XYZ order)
    pub rotation: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: [0.0; 3],
        }
    }
}

/// Material family of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialClass {
    /// Transmissive glass
    Glass,
    /// Transmissive liquid
    Liquid,
    /// Metal
    Metal,
    /// Plastic
    Plastic,
    /// Self-lit surface
    Emission,
    /// Stone
    Stone,
    /// Anything else
    #[serde(other)]
    Unknown,
}

impl MaterialClass {
    /// Whether the class is rendered with light transmission
    pub fn is_transmissive(&self) -> bool {
        matches!(self, Self::Glass | Self::Liquid)
    }
}

/// Physically based material descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbrMaterial {
    /// Material family
    pub material_class: MaterialClass,
    /// Base color as a hex string
    pub base_color: String,
    /// Roughness in [0, 1]
    #[serde(default)]
    pub roughness: f32,
    /// Metalness in [0, 1]
    #[serde(default)]
    pub metalness: f32,
    /// Transmission in [0, 1] (glass and liquid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<f32>,
    /// Index of refraction (glass and liquid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ior: Option<f32>,
    /// Volume thickness (glass and liquid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f32>,
}

impl PbrMaterial {
    /// Parsed base color, white when the hex string is unreadable
    pub fn base_rgb(&self) -> Rgb {
        Rgb::from_hex(&self.base_color).unwrap_or(Rgb::WHITE)
    }
}

/// A persistent renderable object on stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAsset {
    /// Unique id within the document
    pub id: String,
    /// Geometric kind
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// Rest transform
    pub initial_transform: Transform,
    /// Surface description
    pub pbr_material: PbrMaterial,
}

/// Kind of particle effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectKind {
    /// Upward flame from a tight base
    Fire,
    /// Slow, wide, rising plumes
    Smoke,
    /// Slow bubbles wobbling upward inside a volume
    Bubbles,
    /// Fast radial burst under gravity
    Sparks,
    /// Large low-lying drifting haze
    Fog,
    /// Rippling liquid surface
    LiquidWave,
    /// Anything else
    #[serde(other)]
    Unknown,
}

/// Particle count budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Density {
    /// 150 particles
    Medium,
    /// 300 particles
    High,
    /// 50 particles
    #[default]
    #[serde(other)]
    Low,
}

impl Density {
    /// Number of particle slots for this tier
    pub fn particle_count(&self) -> usize {
        match self {
            Density::Low => 50,
            Density::Medium => 150,
            Density::High => 300,
        }
    }
}

/// Simulation speed tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeedTier {
    /// Double speed
    Fast,
    /// Half speed
    #[default]
    #[serde(other)]
    Slow,
}

impl SpeedTier {
    /// Velocity and decay multiplier for this tier
    pub fn multiplier(&self) -> f32 {
        match self {
            SpeedTier::Slow => 0.5,
            SpeedTier::Fast => 2.0,
        }
    }
}

/// Authored knobs for a particle effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfxConfig {
    /// Particle color as a hex string
    pub color: String,
    /// Particle count tier
    #[serde(default)]
    pub density: Density,
    /// Speed tier
    #[serde(default)]
    pub speed: SpeedTier,
    /// Spread and point size multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_multiplier: Option<f32>,
}

impl VfxConfig {
    /// Scale multiplier, 1.0 when absent or zero
    pub fn scale(&self) -> f32 {
        match self.scale_multiplier {
            Some(scale) if scale > 0.0 => scale,
            _ => 1.0,
        }
    }

    /// Parsed particle color, white when unreadable
    pub fn rgb(&self) -> Rgb {
        Rgb::from_hex(&self.color).unwrap_or(Rgb::WHITE)
    }
}

/// One particle effect instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfxAsset {
    /// Unique id within the document
    pub id: String,
    /// Effect kind
    pub effect_type: EffectKind,
    /// Entity this effect is attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_actor_id: Option<String>,
    /// Authored knobs
    pub config: VfxConfig,
    /// Offset from the parent (or scene origin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_offset: Option<[f32; 3]>,
}

impl VfxAsset {
    /// Offset from the origin, zero when absent
    pub fn offset(&self) -> [f32; 3] {
        self.position_offset.unwrap_or([0.0; 3])
    }
}

/// A 2D label anchored relative to the viewport center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiOverlay {
    /// Entity the label describes
    pub target_actor_id: String,
    /// Label text
    pub label_text: String,
    /// Offset from the viewport center in pixels, +y up
    #[serde(default)]
    pub screen_offset: [f32; 2],
}

/// Camera framing hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraZoom {
    /// Tight framing
    Close,
    /// Wide framing
    Wide,
    /// Default framing
    #[default]
    #[serde(other)]
    Medium,
}

/// Kind of visual action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Move toward a position
    MoveTo,
    /// Scale toward a per-axis scale
    ScaleTo,
    /// Rotate toward Euler angles
    RotateTo,
    /// Shift toward a color
    ColorShift,
    /// Fade the entity out
    FadeOut,
    /// Start particle emission
    EmitParticles,
    /// Stop particle emission
    StopParticles,
    /// Anything else (ignored)
    #[serde(other)]
    Unknown,
}

/// An authored instruction for one entity within one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualAction {
    /// Target entity (or effect) id
    pub actor_id: String,
    /// Action kind
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Raw target: an array, a hex color, or a string holding an array
    #[serde(default)]
    pub target_value: serde_json::Value,
    /// Easing hint
    #[serde(default)]
    pub easing: String,
}

/// Narrative text for a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiDisplay {
    /// Chapter title shown in the playback bar
    #[serde(default)]
    pub chapter_title: String,
    /// Explanation shown in the sidebar
    #[serde(default)]
    pub sidebar_explanation: String,
    /// Message the assistant posts when the step begins
    #[serde(default)]
    pub chatbot_update: String,
}

/// Visual events for a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualEvents {
    /// Entity the camera should frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_focus_target: Option<String>,
    /// Framing distance hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_zoom: Option<CameraZoom>,
    /// Actions active while this step is current
    #[serde(default)]
    pub actions: Vec<VisualAction>,
}

/// One entry of the timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineStep {
    /// Authored ordinal
    pub step_id: u32,
    /// How long the step stays current during playback
    pub duration_seconds: f32,
    /// Narrative text
    #[serde(default)]
    pub ui_display: UiDisplay,
    /// Camera and actions
    #[serde(default)]
    pub visual_events: VisualEvents,
}

impl TimelineStep {
    /// Playback duration, never negative
    pub fn duration(&self) -> f32 {
        self.duration_seconds.max(0.0)
    }
}

/// A complete generated simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Title card
    pub meta_data: MetaData,
    /// Presentation settings
    #[serde(default)]
    pub visual_settings: VisualSettings,
    /// Assistant configuration
    #[serde(default)]
    pub lab_assistant_config: LabAssistantConfig,
    /// Entities on stage
    #[serde(default)]
    pub stage_assets: Vec<StageAsset>,
    /// Particle effect instances
    #[serde(default)]
    pub vfx_layer: Vec<VfxAsset>,
    /// 2D labels
    #[serde(default)]
    pub ui_overlays: Vec<UiOverlay>,
    /// Ordered steps
    #[serde(default)]
    pub sync_timeline: Vec<TimelineStep>,
}

impl SceneDocument {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a document file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of steps
    pub fn step_count(&self) -> usize {
        self.sync_timeline.len()
    }

    /// Step at a timeline position
    pub fn step(&self, index: usize) -> Option<&TimelineStep> {
        self.sync_timeline.get(index)
    }

    /// Effects attached to the given entity
    pub fn attached_vfx<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a VfxAsset> + 'a {
        self.vfx_layer
            .iter()
            .filter(move |v| v.parent_actor_id.as_deref() == Some(parent_id))
    }

    /// First sentence of the assistant context brief, without the period
    pub fn brief_lead(&self) -> &str {
        let brief = self.lab_assistant_config.context_brief.trim();
        brief.split('.').next().unwrap_or(brief).trim()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    /// A three-step document with durations [2, 3, 1]
    pub fn three_step_json() -> serde_json::Value {
        json!({
            "meta_data": { "title": "Prism", "scientific_verdict": "Refraction", "is_remix": false },
            "visual_settings": {
                "environment_preset": "studio",
                "post_processing": { "bloom_intensity": 0.5, "vignette": true }
            },
            "lab_assistant_config": {
                "bot_name": "Optics Bot",
                "context_brief": "White light splits into colors. Each wavelength bends differently.",
                "suggested_questions": ["Why does blue bend more?"]
            },
            "stage_assets": [
                {
                    "id": "prism",
                    "type": "cube",
                    "initial_transform": { "position": [0, 1, 0], "scale": [1, 1, 1], "rotation": [0, 0, 0] },
                    "pbr_material": { "material_class": "GLASS", "base_color": "#ffffff", "roughness": 0.1, "metalness": 0.0 }
                },
                {
                    "id": "beam",
                    "type": "cylinder",
                    "initial_transform": { "position": [-3, 1, 0], "scale": [0.1, 1, 0.1], "rotation": [0, 0, 1.57] },
                    "pbr_material": { "material_class": "EMISSION", "base_color": "#ffff00", "roughness": 0.5, "metalness": 0.0 }
                }
            ],
            "vfx_layer": [
                {
                    "id": "glow",
                    "effect_type": "SPARKS",
                    "parent_actor_id": "prism",
                    "config": { "color": "#ffaa00", "density": "HIGH", "speed": "FAST" },
                    "position_offset": [0, 0.5, 0]
                },
                {
                    "id": "haze",
                    "effect_type": "FOG",
                    "config": { "color": "#334455", "density": "LOW", "speed": "SLOW", "scale_multiplier": 2.0 }
                }
            ],
            "ui_overlays": [
                { "target_actor_id": "prism", "label_text": "Prism", "screen_offset": [40, 60] }
            ],
            "sync_timeline": [
                {
                    "step_id": 1,
                    "duration_seconds": 2,
                    "ui_display": { "chapter_title": "Light enters", "sidebar_explanation": "A beam approaches.", "chatbot_update": "Watch the beam." },
                    "visual_events": { "camera_focus_target": "prism", "actions": [] }
                },
                {
                    "step_id": 2,
                    "duration_seconds": 3,
                    "ui_display": { "chapter_title": "Refraction", "sidebar_explanation": "The beam bends.", "chatbot_update": "It bends!" },
                    "visual_events": {
                        "camera_zoom": "CLOSE",
                        "actions": [
                            { "actor_id": "beam", "type": "MOVE_TO", "target_value": [0, 1, 0], "easing": "easeInOut" },
                            { "actor_id": "prism", "type": "COLOR_SHIFT", "target_value": "#ff0000", "easing": "linear" },
                            { "actor_id": "glow", "type": "STOP_PARTICLES", "easing": "linear" }
                        ]
                    }
                },
                {
                    "step_id": 3,
                    "duration_seconds": 1,
                    "ui_display": { "chapter_title": "Spectrum", "sidebar_explanation": "Colors fan out.", "chatbot_update": "A rainbow." },
                    "visual_events": {
                        "camera_zoom": "WIDE",
                        "actions": [
                            { "actor_id": "beam", "type": "SCALE_TO", "target_value": "[2, 2, 2]", "easing": "linear" },
                            { "actor_id": "prism", "type": "FADE_OUT", "easing": "linear" }
                        ]
                    }
                }
            ]
        })
    }

    /// The three-step document, parsed and shared
    pub fn three_step_document() -> Arc<SceneDocument> {
        Arc::new(serde_json::from_value(three_step_json()).expect("fixture parses"))
    }
}
