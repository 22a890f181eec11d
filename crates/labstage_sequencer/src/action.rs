// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-step action resolution.
//!
//! A step's flat action list is partitioned once, when the step becomes
//! current, into one [`ActionSet`] per actor plus an ordered list of particle
//! signals. Animators then read their resolved targets every frame without
//! re-filtering the step.

use crate::document::{ActionKind, TimelineStep};
use crate::value::{Rgb, TargetValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How conflicting actions for the same property within one step are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// The last authored action wins
    #[default]
    LastWins,
    /// The first authored action wins
    FirstWins,
    /// Conflicting actions cancel each other and the property holds
    Reject,
}

/// Animated property an action drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// World position
    Position,
    /// Per-axis scale
    Scale,
    /// Euler rotation
    Rotation,
    /// Surface color
    Color,
}

/// Resolved targets for one actor within one step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionSet {
    /// Position target
    pub position: Option<[f32; 3]>,
    /// Scale target
    pub scale: Option<[f32; 3]>,
    /// Rotation target
    pub rotation: Option<[f32; 3]>,
    /// Color target
    pub color: Option<Rgb>,
    /// Whether the actor fades out during this step
    pub fade_out: bool,
    rejected: Vec<Property>,
}

impl ActionSet {
    /// Whether any transform or color target is set
    pub fn has_targets(&self) -> bool {
        self.position.is_some() || self.scale.is_some() || self.rotation.is_some() || self.color.is_some()
    }

    fn apply(&mut self, property: Property, value: TargetValue, policy: DuplicatePolicy) -> bool {
        if self.rejected.contains(&property) {
            return false;
        }

        let occupied = match property {
            Property::Position => self.position.is_some(),
            Property::Scale => self.scale.is_some(),
            Property::Rotation => self.rotation.is_some(),
            Property::Color => self.color.is_some(),
        };

        if occupied {
            match policy {
                DuplicatePolicy::LastWins => {}
                DuplicatePolicy::FirstWins => return false,
                DuplicatePolicy::Reject => {
                    self.clear(property);
                    self.rejected.push(property);
                    return false;
                }
            }
        }

        match (property, value) {
            (Property::Position, TargetValue::Vec3(v)) => self.position = Some(v),
            (Property::Scale, TargetValue::Vec3(v)) => self.scale = Some(v),
            (Property::Rotation, TargetValue::Vec3(v)) => self.rotation = Some(v),
            (Property::Color, TargetValue::Color(c)) => self.color = Some(c),
            _ => return false,
        }
        true
    }

    fn clear(&mut self, property: Property) {
        match property {
            Property::Position => self.position = None,
            Property::Scale => self.scale = None,
            Property::Rotation => self.rotation = None,
            Property::Color => self.color = None,
        }
    }
}

/// Start or stop signal for particle emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleSignal {
    /// Effect id, or the id of an entity whose attached effects are addressed
    pub actor_id: String,
    /// `true` to start emitting, `false` to stop
    pub emit: bool,
}

/// Everything a step asks of the stage, resolved per actor
#[derive(Debug, Clone, Default)]
pub struct StepBindings {
    actions: IndexMap<String, ActionSet>,
    signals: Vec<ParticleSignal>,
    skipped: usize,
}

impl StepBindings {
    /// Partition a step's actions by actor
    pub fn resolve(step: &TimelineStep, policy: DuplicatePolicy) -> Self {
        let mut bindings = Self::default();

        for action in &step.visual_events.actions {
            // Any action, even a malformed one, means the actor is addressed
            let set = bindings.actions.entry(action.actor_id.clone()).or_default();

            let property = match action.kind {
                ActionKind::MoveTo => Property::Position,
                ActionKind::ScaleTo => Property::Scale,
                ActionKind::RotateTo => Property::Rotation,
                ActionKind::ColorShift => Property::Color,
                ActionKind::FadeOut => {
                    set.fade_out = true;
                    continue;
                }
                ActionKind::EmitParticles | ActionKind::StopParticles => {
                    bindings.signals.push(ParticleSignal {
                        actor_id: action.actor_id.clone(),
                        emit: action.kind == ActionKind::EmitParticles,
                    });
                    continue;
                }
                ActionKind::Unknown => {
                    tracing::debug!("Ignoring unknown action for '{}'", action.actor_id);
                    continue;
                }
            };

            let Some(value) = TargetValue::parse(&action.target_value) else {
                tracing::warn!(
                    "Skipping {:?} for '{}': unreadable target {}",
                    action.kind,
                    action.actor_id,
                    action.target_value
                );
                bindings.skipped += 1;
                continue;
            };

            if !set.apply(property, value, policy) {
                tracing::debug!(
                    "Dropped {:?} for '{}' ({:?})",
                    action.kind,
                    action.actor_id,
                    policy
                );
                bindings.skipped += 1;
            }
        }

        bindings
    }

    /// Resolved set for an actor, `None` when the step never addresses it
    pub fn get(&self, actor_id: &str) -> Option<&ActionSet> {
        self.actions.get(actor_id)
    }

    /// Whether the step contains any action for the actor
    pub fn addresses(&self, actor_id: &str) -> bool {
        self.actions.contains_key(actor_id)
    }

    /// Particle signals in authored order
    pub fn signals(&self) -> &[ParticleSignal] {
        &self.signals
    }

    /// Number of actions that were malformed or lost to the duplicate policy
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Addressed actor ids
    pub fn actors(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(actions: serde_json::Value) -> TimelineStep {
        serde_json::from_value(json!({
            "step_id": 1,
            "duration_seconds": 1,
            "visual_events": { "actions": actions }
        }))
        .unwrap()
    }

    #[test]
    fn test_partition_by_actor() {
        let step = step(json!([
            { "actor_id": "a", "type": "MOVE_TO", "target_value": [1, 2, 3] },
            { "actor_id": "b", "type": "COLOR_SHIFT", "target_value": "#ff0000" },
            { "actor_id": "a", "type": "ROTATE_TO", "target_value": "[0, 3.14, 0]" },
            { "actor_id": "c", "type": "FADE_OUT" },
            { "actor_id": "fx", "type": "STOP_PARTICLES" }
        ]));
        let bindings = StepBindings::resolve(&step, DuplicatePolicy::LastWins);

        let a = bindings.get("a").unwrap();
        assert_eq!(a.position, Some([1.0, 2.0, 3.0]));
        assert_eq!(a.rotation, Some([0.0, 3.14, 0.0]));
        assert!(a.scale.is_none());
        assert_eq!(bindings.get("b").unwrap().color, Some(Rgb([1.0, 0.0, 0.0])));
        assert!(bindings.get("c").unwrap().fade_out);
        assert_eq!(
            bindings.signals(),
            &[ParticleSignal { actor_id: "fx".into(), emit: false }]
        );
        assert!(bindings.get("nobody").is_none());
    }

    #[test]
    fn test_malformed_target_skipped_but_actor_addressed() {
        let step = step(json!([
            { "actor_id": "a", "type": "MOVE_TO", "target_value": "#ff0000" },
            { "actor_id": "a", "type": "SCALE_TO", "target_value": [1, 2] },
            { "actor_id": "b", "type": "WARP", "target_value": [1, 1, 1] }
        ]));
        let bindings = StepBindings::resolve(&step, DuplicatePolicy::LastWins);

        assert_eq!(bindings.skipped(), 2);
        assert!(bindings.addresses("a"));
        assert!(!bindings.get("a").unwrap().has_targets());
        assert!(bindings.addresses("b"));
    }

    #[test]
    fn test_duplicate_policies() {
        let step = step(json!([
            { "actor_id": "a", "type": "MOVE_TO", "target_value": [1, 0, 0] },
            { "actor_id": "a", "type": "MOVE_TO", "target_value": [2, 0, 0] },
            { "actor_id": "a", "type": "MOVE_TO", "target_value": [3, 0, 0] },
            { "actor_id": "a", "type": "SCALE_TO", "target_value": [2, 2, 2] }
        ]));

        let last = StepBindings::resolve(&step, DuplicatePolicy::LastWins);
        assert_eq!(last.get("a").unwrap().position, Some([3.0, 0.0, 0.0]));

        let first = StepBindings::resolve(&step, DuplicatePolicy::FirstWins);
        assert_eq!(first.get("a").unwrap().position, Some([1.0, 0.0, 0.0]));

        let reject = StepBindings::resolve(&step, DuplicatePolicy::Reject);
        let set = reject.get("a").unwrap();
        assert_eq!(set.position, None);
        assert_eq!(set.scale, Some([2.0, 2.0, 2.0]));
    }
}
