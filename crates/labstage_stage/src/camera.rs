// SPDX-License-Identifier: MIT OR Apache-2.0
//! Orbit camera rig that follows the current step's framing.

use labstage_sequencer::{CameraZoom, Interpolation};
use serde::{Deserialize, Serialize};

/// Default eye position
pub const DEFAULT_EYE: [f32; 3] = [0.0, 5.0, 10.0];
/// Default vertical field of view in degrees
pub const DEFAULT_FOV: f32 = 45.0;

const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 500.0;

/// Orbit distance for each zoom hint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomDistances {
    /// CLOSE framing
    pub close: f32,
    /// MEDIUM framing (also used when no hint is given)
    pub medium: f32,
    /// WIDE framing
    pub wide: f32,
}

impl Default for ZoomDistances {
    fn default() -> Self {
        Self {
            close: 5.0,
            medium: 10.0,
            wide: 18.0,
        }
    }
}

impl ZoomDistances {
    /// Distance for a hint, MEDIUM when absent
    pub fn distance(&self, zoom: Option<CameraZoom>) -> f32 {
        match zoom.unwrap_or_default() {
            CameraZoom::Close => self.close,
            CameraZoom::Medium => self.medium,
            CameraZoom::Wide => self.wide,
        }
    }
}

/// A point projected into normalized viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    /// 0 at the left edge, 1 at the right edge
    pub x: f32,
    /// 0 at the top edge, 1 at the bottom edge
    pub y: f32,
    /// Distance along the view direction
    pub depth: f32,
}

/// Camera that orbits a smoothly moving focus point
#[derive(Debug, Clone)]
pub struct CameraRig {
    /// Camera position
    pub position: [f32; 3],
    /// Look-at point
    pub target: [f32; 3],
    /// World up
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Orbit distance from target
    pub distance: f32,
    /// Orbit yaw in radians
    pub yaw: f32,
    /// Orbit pitch in radians
    pub pitch: f32,
    /// User zoom applied on top of the framing distance
    pub zoom_scale: f32,
    goal_target: [f32; 3],
    goal_distance: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        let [x, y, z] = DEFAULT_EYE;
        let horizontal = (x * x + z * z).sqrt();
        let distance = (horizontal * horizontal + y * y).sqrt();
        let mut rig = Self {
            position: DEFAULT_EYE,
            target: [0.0; 3],
            up: [0.0, 1.0, 0.0],
            fov: DEFAULT_FOV,
            distance,
            yaw: x.atan2(z),
            pitch: y.atan2(horizontal),
            zoom_scale: 1.0,
            goal_target: [0.0; 3],
            goal_distance: distance,
        };
        rig.update_position();
        rig
    }
}

impl CameraRig {
    /// Create a rig at the default eye
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the framing the rig approaches
    pub fn set_goal(&mut self, target: [f32; 3], distance: f32) {
        self.goal_target = target;
        self.goal_distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Current framing goal
    pub fn goal(&self) -> ([f32; 3], f32) {
        (self.goal_target, self.goal_distance)
    }

    /// Approach the goal by `alpha`
    pub fn update(&mut self, alpha: f32) {
        self.target = Interpolation::lerp_vec3(self.target, self.goal_target, alpha);
        let distance = (self.goal_distance * self.zoom_scale).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.distance = Interpolation::lerp(self.distance, distance, alpha);
        self.update_position();
    }

    /// Orbit around the target
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
        self.update_position();
    }

    /// Scale the user zoom; positive `delta` moves closer
    pub fn zoom(&mut self, delta: f32) {
        self.zoom_scale = (self.zoom_scale * (1.0 - delta * 0.1)).clamp(0.1, 10.0);
    }

    fn update_position(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();

        self.position = [self.target[0] + x, self.target[1] + y, self.target[2] + z];
    }

    /// Unit view direction
    pub fn forward(&self) -> [f32; 3] {
        normalize(sub(self.target, self.position))
    }

    /// Unit right direction (`forward x up`)
    pub fn right(&self) -> [f32; 3] {
        normalize(cross(self.forward(), self.up))
    }

    /// Orthogonalized up direction (`right x forward`)
    pub fn true_up(&self) -> [f32; 3] {
        cross(self.right(), self.forward())
    }

    /// Perspective-project a world point.
    ///
    /// Returns `None` for points behind or too close to the camera.
    pub fn project(&self, world: [f32; 3], aspect: f32) -> Option<Projected> {
        let to_point = sub(world, self.position);
        let depth = dot(to_point, self.forward());
        if depth <= 0.1 {
            return None;
        }

        let x = dot(to_point, self.right());
        let y = dot(to_point, self.true_up());
        let fov_factor = (self.fov.to_radians() * 0.5).tan();
        let aspect = aspect.max(1e-3);

        Some(Projected {
            x: (x / (depth * fov_factor * aspect)) * 0.5 + 0.5,
            y: (-y / (depth * fov_factor)) * 0.5 + 0.5,
            depth,
        })
    }

    /// Projected size of a world-space length at a given depth, as a fraction of viewport height
    pub fn projected_size(&self, length: f32, depth: f32) -> f32 {
        let fov_factor = (self.fov.to_radians() * 0.5).tan();
        length / (depth.max(0.1) * fov_factor) * 0.5
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, -1.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye() {
        let rig = CameraRig::default();
        for (a, b) in rig.position.iter().zip(DEFAULT_EYE) {
            assert!((a - b).abs() < 1e-4);
        }
        assert_eq!(rig.fov, 45.0);
    }

    #[test]
    fn test_target_projects_to_center() {
        let rig = CameraRig::default();
        let p = rig.project([0.0; 3], 16.0 / 9.0).unwrap();
        assert!((p.x - 0.5).abs() < 1e-5);
        assert!((p.y - 0.5).abs() < 1e-5);

        // +x is to the right, +y is up
        let right = rig.project([1.0, 0.0, 0.0], 1.0).unwrap();
        assert!(right.x > 0.5);
        let up = rig.project([0.0, 1.0, 0.0], 1.0).unwrap();
        assert!(up.y < 0.5);

        assert!(rig.project([0.0, 5.0, 20.0], 1.0).is_none());
    }

    #[test]
    fn test_rig_approaches_goal() {
        let mut rig = CameraRig::default();
        let zoom = ZoomDistances::default();
        rig.set_goal([2.0, 0.0, 0.0], zoom.distance(Some(CameraZoom::Close)));
        for _ in 0..300 {
            rig.update(0.1);
        }
        assert!(Interpolation::max_distance(rig.target, [2.0, 0.0, 0.0]) < 1e-3);
        assert!((rig.distance - 5.0).abs() < 1e-3);
        assert_eq!(zoom.distance(None), 10.0);
        assert_eq!(zoom.distance(Some(CameraZoom::Wide)), 18.0);
    }
}
