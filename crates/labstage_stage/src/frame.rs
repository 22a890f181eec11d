// SPDX-License-Identifier: MIT OR Apache-2.0
//! Composed frame handed to a renderer.

use crate::animator::Pose;
use crate::camera::CameraRig;
use crate::environment::Environment;
use crate::material::{Geometry, MaterialLook};
use labstage_sequencer::{EffectKind, Rgb};

/// One entity to draw
#[derive(Debug, Clone)]
pub struct EntityFrame<'a> {
    /// Entity id
    pub id: &'a str,
    /// Mesh
    pub geometry: Geometry,
    /// Surface
    pub look: &'a MaterialLook,
    /// Live transform, color and opacity
    pub pose: Pose,
}

/// One particle effect to draw
#[derive(Debug, Clone)]
pub struct ParticleFrame<'a> {
    /// Effect id
    pub id: &'a str,
    /// Effect kind
    pub kind: EffectKind,
    /// Point color
    pub color: Rgb,
    /// World-space point size
    pub point_size: f32,
    /// Point opacity
    pub opacity: f32,
    /// World positions of live particles
    pub points: Vec<[f32; 3]>,
}

/// One overlay label to draw
#[derive(Debug, Clone)]
pub struct OverlayFrame<'a> {
    /// Label text
    pub text: &'a str,
    /// Described entity
    pub target_id: &'a str,
    /// Offset from the viewport center in pixels, +y up
    pub screen_offset: [f32; 2],
    /// Live world position of the described entity, if it exists
    pub anchor: Option<[f32; 3]>,
}

impl OverlayFrame<'_> {
    /// Screen position for a viewport center, in a y-down pixel space
    pub fn screen_position(&self, center: [f32; 2]) -> [f32; 2] {
        [center[0] + self.screen_offset[0], center[1] - self.screen_offset[1]]
    }
}

/// Everything needed to draw one frame
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Backdrop and lighting
    pub environment: &'a Environment,
    /// Background star positions (empty for light presets)
    pub stars: &'a [[f32; 3]],
    /// Camera
    pub camera: &'a CameraRig,
    /// Entities in document order
    pub entities: Vec<EntityFrame<'a>>,
    /// Particle effects in document order
    pub particles: Vec<ParticleFrame<'a>>,
    /// Overlays, empty when labels are hidden
    pub overlays: Vec<OverlayFrame<'a>>,
    /// Current step index
    pub step_index: usize,
}

impl Frame<'_> {
    /// Total number of live particles
    pub fn particle_count(&self) -> usize {
        self.particles.iter().map(|p| p.points.len()).sum()
    }
}
