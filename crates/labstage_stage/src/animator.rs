// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity animators.

use labstage_sequencer::{ActionSet, AssetKind, Interpolation, Rgb, StageAsset};
use serde::{Deserialize, Serialize};

/// How fast live values approach their targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Smoothing {
    /// Fixed fraction of the remaining distance per frame
    PerFrame(f32),
    /// Remaining distance halves every given number of seconds
    HalfLife(f32),
}

impl Smoothing {
    /// Smoothing factor for a frame of `delta_time` seconds, in [0, 1]
    pub fn alpha(&self, delta_time: f32) -> f32 {
        let alpha = match *self {
            Smoothing::PerFrame(alpha) => alpha,
            Smoothing::HalfLife(half_life) => Interpolation::half_life_alpha(delta_time, half_life),
        };
        if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::PerFrame(0.1)
    }
}

/// Animated state of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World position
    pub position: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
    /// Euler rotation in radians (XYZ order)
    pub rotation: [f32; 3],
    /// Surface color
    pub color: Rgb,
    /// Opacity in [0, 1]
    pub opacity: f32,
}

impl Pose {
    /// Rest pose of an authored entity
    pub fn rest(asset: &StageAsset) -> Self {
        let t = &asset.initial_transform;
        Self {
            position: t.position,
            scale: t.scale,
            rotation: t.rotation,
            color: asset.pbr_material.base_rgb(),
            opacity: 1.0,
        }
    }

    /// Map a point from entity-local space to world space.
    ///
    /// Applies scale, then the XYZ Euler rotation, then translation.
    pub fn transform_point(&self, local: [f32; 3]) -> [f32; 3] {
        let scaled = [
            local[0] * self.scale[0],
            local[1] * self.scale[1],
            local[2] * self.scale[2],
        ];
        let rotated = rotate_xyz(scaled, self.rotation);
        [
            rotated[0] + self.position[0],
            rotated[1] + self.position[1],
            rotated[2] + self.position[2],
        ]
    }
}

/// Rotate a vector by intrinsic XYZ Euler angles (`Rx * Ry * Rz * v`)
pub fn rotate_xyz(v: [f32; 3], euler: [f32; 3]) -> [f32; 3] {
    let (sx, cx) = euler[0].sin_cos();
    let (sy, cy) = euler[1].sin_cos();
    let (sz, cz) = euler[2].sin_cos();

    // Rz
    let v = [v[0] * cz - v[1] * sz, v[0] * sz + v[1] * cz, v[2]];
    // Ry
    let v = [v[0] * cy + v[2] * sy, v[1], -v[0] * sy + v[2] * cy];
    // Rx
    [v[0], v[1] * cx - v[2] * sx, v[1] * sx + v[2] * cx]
}

/// Live transform and color of one entity
#[derive(Debug, Clone)]
pub struct EntityAnimator {
    id: String,
    kind: AssetKind,
    rest: Pose,
    live: Pose,
}

impl EntityAnimator {
    /// Create an animator at the entity's rest pose
    pub fn new(asset: &StageAsset) -> Self {
        let rest = Pose::rest(asset);
        Self {
            id: asset.id.clone(),
            kind: asset.kind,
            rest,
            live: rest,
        }
    }

    /// Advance one frame.
    ///
    /// `actions` is the entity's resolved set for the current step, or `None`
    /// when the step does not address it. An unaddressed entity on the first
    /// step returns toward its rest pose; otherwise it holds.
    pub fn update(&mut self, actions: Option<&ActionSet>, at_first_step: bool, alpha: f32) {
        let live = &mut self.live;
        match actions {
            Some(set) => {
                if let Some(target) = set.position {
                    live.position = Interpolation::lerp_vec3(live.position, target, alpha);
                }
                if let Some(target) = set.scale {
                    live.scale = Interpolation::lerp_vec3(live.scale, target, alpha);
                }
                if let Some(target) = set.rotation {
                    live.rotation = Interpolation::lerp_vec3(live.rotation, target, alpha);
                }
                if let Some(target) = set.color {
                    live.color = Interpolation::lerp_rgb(live.color, target, alpha);
                }
                if set.fade_out {
                    live.opacity = Interpolation::lerp(live.opacity, 0.0, alpha);
                }
            }
            None if at_first_step => {
                let rest = self.rest;
                live.position = Interpolation::lerp_vec3(live.position, rest.position, alpha);
                live.scale = Interpolation::lerp_vec3(live.scale, rest.scale, alpha);
                live.rotation = Interpolation::lerp_vec3(live.rotation, rest.rotation, alpha);
                live.color = Interpolation::lerp_rgb(live.color, rest.color, alpha);
                live.opacity = Interpolation::lerp(live.opacity, rest.opacity, alpha);
            }
            None => {}
        }
    }

    /// Entity id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Geometric kind
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Current animated state
    pub fn pose(&self) -> &Pose {
        &self.live
    }

    /// Whether the entity is still visible
    pub fn is_visible(&self) -> bool {
        self.live.opacity > 0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labstage_sequencer::{DuplicatePolicy, StepBindings, TimelineStep};
    use serde_json::json;

    fn asset() -> StageAsset {
        serde_json::from_value(json!({
            "id": "ball",
            "type": "sphere",
            "initial_transform": { "position": [0, 1, 0], "scale": [1, 1, 1], "rotation": [0, 0, 0] },
            "pbr_material": { "material_class": "PLASTIC", "base_color": "#0000ff", "roughness": 0.5, "metalness": 0.0 }
        }))
        .unwrap()
    }

    fn bindings(actions: serde_json::Value) -> StepBindings {
        let step: TimelineStep = serde_json::from_value(json!({
            "step_id": 1, "duration_seconds": 1, "visual_events": { "actions": actions }
        }))
        .unwrap();
        StepBindings::resolve(&step, DuplicatePolicy::LastWins)
    }

    #[test]
    fn test_move_converges_monotonically() {
        let mut animator = EntityAnimator::new(&asset());
        let b = bindings(json!([{ "actor_id": "ball", "type": "MOVE_TO", "target_value": [4, 1, -2] }]));
        let target = [4.0, 1.0, -2.0];

        let mut last = Interpolation::max_distance(animator.pose().position, target);
        for _ in 0..200 {
            animator.update(b.get("ball"), false, 0.1);
            let d = Interpolation::max_distance(animator.pose().position, target);
            assert!(d <= last + 1e-6);
            last = d;
        }
        assert!(last < 1e-3);
        // Untargeted properties hold
        assert_eq!(animator.pose().scale, [1.0; 3]);
        assert_eq!(animator.pose().color, Rgb([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_color_and_fade() {
        let mut animator = EntityAnimator::new(&asset());
        let b = bindings(json!([
            { "actor_id": "ball", "type": "COLOR_SHIFT", "target_value": "#ff0000" },
            { "actor_id": "ball", "type": "FADE_OUT" }
        ]));
        for _ in 0..200 {
            animator.update(b.get("ball"), false, 0.1);
        }
        let [r, g, bl] = animator.pose().color.0;
        assert!((r - 1.0).abs() < 1e-3 && g.abs() < 1e-3 && bl.abs() < 1e-3);
        assert!(!animator.is_visible());
    }

    #[test]
    fn test_rest_pose_on_first_step_only() {
        let mut animator = EntityAnimator::new(&asset());
        let b = bindings(json!([{ "actor_id": "ball", "type": "MOVE_TO", "target_value": [5, 5, 5] }]));
        for _ in 0..100 {
            animator.update(b.get("ball"), false, 0.1);
        }
        let moved = animator.pose().position;

        // Unaddressed on a later step: hold
        animator.update(None, false, 0.1);
        assert_eq!(animator.pose().position, moved);

        // Unaddressed on the first step: back to rest, closer every frame
        let rest = [0.0, 1.0, 0.0];
        let mut last = Interpolation::max_distance(animator.pose().position, rest);
        for _ in 0..300 {
            animator.update(None, true, 0.1);
            let d = Interpolation::max_distance(animator.pose().position, rest);
            assert!(d <= last + 1e-6);
            last = d;
        }
        assert!(last < 1e-3);
    }

    #[test]
    fn test_addressed_entity_on_first_step_skips_rest() {
        let mut animator = EntityAnimator::new(&asset());
        // Malformed action: the entity is addressed but gets no target
        let b = bindings(json!([{ "actor_id": "ball", "type": "MOVE_TO", "target_value": "#fff" }]));
        let go = bindings(json!([{ "actor_id": "ball", "type": "MOVE_TO", "target_value": [3, 3, 3] }]));
        for _ in 0..50 {
            animator.update(go.get("ball"), false, 0.1);
        }
        let moved = animator.pose().position;
        animator.update(b.get("ball"), true, 0.1);
        assert_eq!(animator.pose().position, moved);
    }

    #[test]
    fn test_smoothing_alpha() {
        assert_eq!(Smoothing::default().alpha(0.5), 0.1);
        assert_eq!(Smoothing::PerFrame(3.0).alpha(0.016), 1.0);
        let half = Smoothing::HalfLife(0.25).alpha(0.25);
        assert!((half - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_transform_point() {
        let pose = Pose {
            position: [1.0, 0.0, 0.0],
            scale: [2.0, 2.0, 2.0],
            rotation: [0.0, 0.0, std::f32::consts::FRAC_PI_2],
            color: Rgb::WHITE,
            opacity: 1.0,
        };
        let p = pose.transform_point([1.0, 0.0, 0.0]);
        assert!((p[0] - 1.0).abs() < 1e-5);
        assert!((p[1] - 2.0).abs() < 1e-5);
        assert!(p[2].abs() < 1e-5);
    }
}
