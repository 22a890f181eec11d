// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene composition.
//!
//! A [`Stage`] is built once per document. It owns exactly one
//! [`EntityAnimator`] per entity id and one [`ParticleUnit`] per effect id for
//! the lifetime of that document; a new document means a new stage.
//!
//! Every step is resolved into [`StepBindings`] when the stage is built, and
//! the emitting state of every effect at every step is folded from the
//! start/stop signals of all steps up to it. Changing steps is then a lookup:
//! animators and particle pools keep their state, only their targets change.

use crate::animator::{EntityAnimator, Smoothing};
use crate::camera::{CameraRig, ZoomDistances};
use crate::environment::{starfield, Environment};
use crate::frame::{EntityFrame, Frame, OverlayFrame, ParticleFrame};
use crate::material::{Geometry, MaterialLook};
use crate::particle::{ParticleUnit, POINT_OPACITY};
use indexmap::IndexMap;
use labstage_sequencer::{DuplicatePolicy, SceneDocument, StepBindings, TimelineStep};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const STAR_SEED: u64 = 0x5eed_57a5;

/// Animation tuning shared by every stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StageSettings {
    /// Approach rate for animators and the camera
    pub smoothing: Smoothing,
    /// Handling of conflicting actions within a step
    pub duplicate_policy: DuplicatePolicy,
    /// Camera distance per zoom hint
    pub zoom: ZoomDistances,
}

struct EntitySlot {
    animator: EntityAnimator,
    geometry: Geometry,
    look: MaterialLook,
}

/// Live presentation of one document
pub struct Stage {
    document: Arc<SceneDocument>,
    settings: StageSettings,
    entities: IndexMap<String, EntitySlot>,
    units: IndexMap<String, ParticleUnit>,
    bindings: Vec<StepBindings>,
    /// Emitting flag per step, per unit (in `units` order)
    emitting: Vec<Vec<bool>>,
    environment: Environment,
    stars: Vec<[f32; 3]>,
    camera: CameraRig,
    step_index: usize,
    empty: StepBindings,
}

impl Stage {
    /// Build the stage for a document, positioned at the first step
    pub fn new(document: Arc<SceneDocument>, settings: StageSettings) -> Self {
        let mut entities = IndexMap::new();
        for asset in &document.stage_assets {
            if entities.contains_key(&asset.id) {
                tracing::warn!("Duplicate entity id '{}' ignored", asset.id);
                continue;
            }
            entities.insert(
                asset.id.clone(),
                EntitySlot {
                    animator: EntityAnimator::new(asset),
                    geometry: Geometry::for_kind(asset.kind),
                    look: MaterialLook::from_material(&asset.pbr_material),
                },
            );
        }

        let mut units: IndexMap<String, ParticleUnit> = IndexMap::new();
        for vfx in &document.vfx_layer {
            if units.contains_key(&vfx.id) {
                tracing::warn!("Duplicate effect id '{}' ignored", vfx.id);
                continue;
            }
            if let Some(parent) = &vfx.parent_actor_id {
                if !entities.contains_key(parent) {
                    tracing::warn!("Effect '{}' has unknown parent '{}'", vfx.id, parent);
                }
            }
            units.insert(vfx.id.clone(), ParticleUnit::new(vfx));
        }

        let bindings: Vec<StepBindings> = document
            .sync_timeline
            .iter()
            .map(|step| StepBindings::resolve(step, settings.duplicate_policy))
            .collect();
        let emitting = fold_emission(&document, &units, &bindings);

        let environment = Environment::from_settings(&document.visual_settings);
        let stars = starfield(environment.star_count, STAR_SEED);

        tracing::info!(
            "Stage built: {} entities, {} effects, {} steps",
            entities.len(),
            units.len(),
            bindings.len()
        );

        let mut stage = Self {
            document,
            settings,
            entities,
            units,
            bindings,
            emitting,
            environment,
            stars,
            camera: CameraRig::default(),
            step_index: 0,
            empty: StepBindings::default(),
        };
        stage.enter_step(0);
        stage
    }

    /// Make a step current.
    ///
    /// Only targets and emitting flags change; animator and particle state is kept.
    pub fn enter_step(&mut self, index: usize) {
        let last = self.bindings.len().saturating_sub(1);
        self.step_index = index.min(last);

        if let Some(flags) = self.emitting.get(self.step_index) {
            for (unit, emitting) in self.units.values_mut().zip(flags) {
                unit.set_emitting(*emitting);
            }
        }

        if let Some(bindings) = self.bindings.get(self.step_index) {
            tracing::debug!(
                "Step {}: {} actors addressed, {} particle signals",
                self.step_index + 1,
                bindings.actors().count(),
                bindings.signals().len()
            );
        }
    }

    /// Advance every animator, particle unit and the camera
    pub fn update(&mut self, delta_time: f32) {
        let alpha = self.settings.smoothing.alpha(delta_time);
        let at_first_step = self.step_index == 0;
        let bindings = self.bindings.get(self.step_index).unwrap_or(&self.empty);

        for (id, slot) in self.entities.iter_mut() {
            slot.animator.update(bindings.get(id), at_first_step, alpha);
        }

        for unit in self.units.values_mut() {
            unit.update(delta_time);
        }

        let (target, distance) = self.camera_goal();
        self.camera.set_goal(target, distance);
        self.camera.update(alpha);
    }

    fn camera_goal(&self) -> ([f32; 3], f32) {
        let events = self.current_step().map(|s| &s.visual_events);
        let target = events
            .and_then(|e| e.camera_focus_target.as_deref())
            .and_then(|id| self.entities.get(id))
            .map_or([0.0; 3], |slot| slot.animator.pose().position);
        let distance = self.settings.zoom.distance(events.and_then(|e| e.camera_zoom));
        (target, distance)
    }

    /// World position of an effect's origin
    pub fn unit_origin(&self, unit: &ParticleUnit) -> [f32; 3] {
        self.unit_transform(unit, [0.0; 3])
    }

    fn unit_transform(&self, unit: &ParticleUnit, local: [f32; 3]) -> [f32; 3] {
        let offset = unit.offset();
        let local = [local[0] + offset[0], local[1] + offset[1], local[2] + offset[2]];
        match unit.parent().and_then(|id| self.entities.get(id)) {
            Some(slot) => slot.animator.pose().transform_point(local),
            None => local,
        }
    }

    /// Compose the current frame
    pub fn frame(&self, labels_visible: bool) -> Frame<'_> {
        let entities = self
            .entities
            .iter()
            .map(|(id, slot)| EntityFrame {
                id: id.as_str(),
                geometry: slot.geometry,
                look: &slot.look,
                pose: *slot.animator.pose(),
            })
            .collect();

        let particles = self
            .units
            .values()
            .map(|unit| ParticleFrame {
                id: unit.id(),
                kind: unit.kind(),
                color: unit.color(),
                point_size: unit.point_size(),
                opacity: POINT_OPACITY,
                points: unit
                    .live_particles()
                    .map(|p| self.unit_transform(unit, p.position))
                    .collect(),
            })
            .collect();

        let overlays = if labels_visible {
            self.document
                .ui_overlays
                .iter()
                .map(|overlay| OverlayFrame {
                    text: &overlay.label_text,
                    target_id: &overlay.target_actor_id,
                    screen_offset: overlay.screen_offset,
                    anchor: self
                        .entities
                        .get(&overlay.target_actor_id)
                        .map(|slot| slot.animator.pose().position),
                })
                .collect()
        } else {
            Vec::new()
        };

        Frame {
            environment: &self.environment,
            stars: &self.stars,
            camera: &self.camera,
            entities,
            particles,
            overlays,
            step_index: self.step_index,
        }
    }

    /// Document this stage presents
    pub fn document(&self) -> &Arc<SceneDocument> {
        &self.document
    }

    /// Current step index
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Current step
    pub fn current_step(&self) -> Option<&TimelineStep> {
        self.document.step(self.step_index)
    }

    /// Resolved bindings of the current step
    pub fn bindings(&self) -> &StepBindings {
        self.bindings.get(self.step_index).unwrap_or(&self.empty)
    }

    /// Animator for an entity
    pub fn animator(&self, id: &str) -> Option<&EntityAnimator> {
        self.entities.get(id).map(|slot| &slot.animator)
    }

    /// Particle unit for an effect
    pub fn unit(&self, id: &str) -> Option<&ParticleUnit> {
        self.units.get(id)
    }

    /// Number of animators
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of particle units
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Resolved environment
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Camera rig
    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// Camera rig, for user orbit and zoom
    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    /// Settings this stage was built with
    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }
}

/// Emitting state of every unit at every step.
///
/// Units start emitting. Each step's signals apply in order; a signal naming an
/// effect id addresses that effect, any other id addresses every effect
/// parented to it.
fn fold_emission(
    document: &SceneDocument,
    units: &IndexMap<String, ParticleUnit>,
    bindings: &[StepBindings],
) -> Vec<Vec<bool>> {
    let mut state = vec![true; units.len()];
    let mut per_step = Vec::with_capacity(bindings.len());

    for step in bindings {
        for signal in step.signals() {
            if let Some(index) = units.get_index_of(&signal.actor_id) {
                state[index] = signal.emit;
                continue;
            }

            let mut matched = false;
            for vfx in document.attached_vfx(&signal.actor_id) {
                if let Some(index) = units.get_index_of(&vfx.id) {
                    state[index] = signal.emit;
                    matched = true;
                }
            }
            if !matched {
                tracing::warn!("Particle signal for unknown actor '{}'", signal.actor_id);
            }
        }
        per_step.push(state.clone());
    }

    per_step
}

#[cfg(test)]
mod tests {
    use super::*;
    use labstage_sequencer::{Interpolation, PlayerEvent, RearmPolicy, TimelinePlayer};
    use serde_json::json;

    fn document() -> Arc<SceneDocument> {
        Arc::new(
            serde_json::from_value(json!({
                "meta_data": { "title": "Candle" },
                "visual_settings": { "environment_preset": "night" },
                "stage_assets": [
                    {
                        "id": "candle",
                        "type": "cylinder",
                        "initial_transform": { "position": [0, 0, 0], "scale": [1, 1, 1], "rotation": [0, 0, 0] },
                        "pbr_material": { "material_class": "PLASTIC", "base_color": "#ffffff" }
                    },
                    {
                        "id": "jar",
                        "type": "glb_asset",
                        "initial_transform": { "position": [3, 0, 0], "scale": [2, 2, 2], "rotation": [0, 0, 0] },
                        "pbr_material": { "material_class": "GLASS", "base_color": "#aaccff" }
                    }
                ],
                "vfx_layer": [
                    {
                        "id": "flame",
                        "effect_type": "FIRE",
                        "parent_actor_id": "candle",
                        "config": { "color": "#ff8800", "density": "LOW", "speed": "FAST" },
                        "position_offset": [0, 1, 0]
                    },
                    {
                        "id": "smoke",
                        "effect_type": "SMOKE",
                        "parent_actor_id": "candle",
                        "config": { "color": "#444444", "density": "MEDIUM", "speed": "SLOW" }
                    },
                    {
                        "id": "mist",
                        "effect_type": "FOG",
                        "config": { "color": "#ccddee", "density": "LOW", "speed": "SLOW" },
                        "position_offset": [0, -1, 0]
                    }
                ],
                "ui_overlays": [
                    { "target_actor_id": "jar", "label_text": "Oxygen", "screen_offset": [100, 50] },
                    { "target_actor_id": "ghost", "label_text": "Nothing", "screen_offset": [0, 0] }
                ],
                "sync_timeline": [
                    { "step_id": 1, "duration_seconds": 2, "visual_events": { "actions": [] } },
                    {
                        "step_id": 2,
                        "duration_seconds": 3,
                        "visual_events": {
                            "camera_focus_target": "jar",
                            "camera_zoom": "CLOSE",
                            "actions": [
                                { "actor_id": "jar", "type": "MOVE_TO", "target_value": [0, 0, 0] },
                                { "actor_id": "jar", "type": "SCALE_TO", "target_value": [1, 1, 1] }
                            ]
                        }
                    },
                    {
                        "step_id": 3,
                        "duration_seconds": 1,
                        "visual_events": {
                            "actions": [
                                { "actor_id": "flame", "type": "STOP_PARTICLES" },
                                { "actor_id": "candle", "type": "FADE_OUT" }
                            ]
                        }
                    },
                    {
                        "step_id": 4,
                        "duration_seconds": 1,
                        "visual_events": {
                            "actions": [
                                { "actor_id": "candle", "type": "STOP_PARTICLES" },
                                { "actor_id": "mist", "type": "STOP_PARTICLES" }
                            ]
                        }
                    },
                    {
                        "step_id": 5,
                        "duration_seconds": 1,
                        "visual_events": {
                            "actions": [ { "actor_id": "candle", "type": "EMIT_PARTICLES" } ]
                        }
                    }
                ]
            }))
            .unwrap(),
        )
    }

    fn emitting(stage: &Stage) -> [bool; 3] {
        ["flame", "smoke", "mist"].map(|id| stage.unit(id).unwrap().is_emitting())
    }

    #[test]
    fn test_one_animator_and_unit_per_id() {
        let stage = Stage::new(document(), StageSettings::default());
        assert_eq!(stage.entity_count(), 2);
        assert_eq!(stage.unit_count(), 3);
        assert_eq!(stage.unit("smoke").unwrap().capacity(), 150);
        assert!(stage.environment().is_dark());
        assert_eq!(stage.frame(true).stars.len(), 5000);
    }

    #[test]
    fn test_emission_fold_is_scrub_deterministic() {
        let mut stage = Stage::new(document(), StageSettings::default());
        assert_eq!(emitting(&stage), [true, true, true]);

        stage.enter_step(2);
        assert_eq!(emitting(&stage), [false, true, true]);

        stage.enter_step(3);
        assert_eq!(emitting(&stage), [false, false, false]);

        stage.enter_step(4);
        assert_eq!(emitting(&stage), [true, true, false]);

        // Scrubbing back recomputes from the fold, not from history
        stage.enter_step(1);
        assert_eq!(emitting(&stage), [true, true, true]);
        stage.enter_step(3);
        assert_eq!(emitting(&stage), [false, false, false]);
    }

    #[test]
    fn test_parented_effects_follow_parent() {
        let mut stage = Stage::new(document(), StageSettings::default());
        let flame = stage.unit("flame").unwrap();
        assert_eq!(stage.unit_origin(flame), [0.0, 1.0, 0.0]);
        let mist = stage.unit("mist").unwrap();
        assert_eq!(stage.unit_origin(mist), [0.0, -1.0, 0.0]);

        // The jar moves on step 2; nothing is parented to it, the candle holds
        stage.enter_step(1);
        for _ in 0..200 {
            stage.update(1.0 / 60.0);
        }
        let jar = stage.animator("jar").unwrap().pose();
        assert!(Interpolation::max_distance(jar.position, [0.0; 3]) < 1e-3);
        let flame = stage.unit("flame").unwrap();
        assert_eq!(stage.unit_origin(flame), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_overlays_and_labels() {
        let stage = Stage::new(document(), StageSettings::default());
        let frame = stage.frame(true);
        assert_eq!(frame.overlays.len(), 2);
        assert_eq!(frame.overlays[0].anchor, Some([3.0, 0.0, 0.0]));
        assert_eq!(frame.overlays[0].screen_position([400.0, 300.0]), [500.0, 250.0]);
        assert_eq!(frame.overlays[1].anchor, None);

        assert!(stage.frame(false).overlays.is_empty());
    }

    #[test]
    fn test_camera_follows_focus_and_zoom() {
        let mut stage = Stage::new(document(), StageSettings::default());
        stage.enter_step(1);
        for _ in 0..300 {
            stage.update(1.0 / 60.0);
        }
        let camera = stage.camera();
        assert!(Interpolation::max_distance(camera.target, [0.0; 3]) < 1e-2);
        assert!((camera.distance - 5.0).abs() < 1e-2);
    }

    #[test]
    fn test_fade_out_and_rest_pose() {
        let mut stage = Stage::new(document(), StageSettings::default());
        stage.enter_step(2);
        for _ in 0..200 {
            stage.update(1.0 / 60.0);
        }
        assert!(!stage.animator("candle").unwrap().is_visible());

        stage.enter_step(0);
        for _ in 0..200 {
            stage.update(1.0 / 60.0);
        }
        let candle = stage.animator("candle").unwrap().pose();
        assert!((candle.opacity - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_player_drives_stage_end_to_end() {
        let doc = document();
        let mut player = TimelinePlayer::new(RearmPolicy::KeepInFlight);
        player.load(doc.clone());
        let mut stage = Stage::new(doc, StageSettings::default());

        player.play();
        let mut visited = vec![0];
        for _ in 0..(9 * 60) {
            player.update(1.0 / 60.0);
            for event in player.take_events() {
                if let PlayerEvent::StepChanged { to, .. } = event {
                    stage.enter_step(to);
                    visited.push(to);
                }
            }
            stage.update(1.0 / 60.0);
        }
        assert_eq!(visited, vec![0, 1, 2, 3, 4]);
        assert_eq!(stage.step_index(), 4);
        assert!(!player.is_playing());
        assert_eq!(stage.unit("flame").unwrap().capacity(), 50);
    }

    #[test]
    fn test_frame_contents() {
        let mut stage = Stage::new(document(), StageSettings::default());
        stage.update(1.0 / 60.0);
        let frame = stage.frame(true);
        assert_eq!(frame.entities.len(), 2);
        assert_eq!(frame.entities[1].geometry, Geometry::Sphere { segments: 16 });
        assert!(frame.entities[1].look.transparent);
        assert_eq!(frame.particles.len(), 3);
        assert!(frame.particle_count() <= 50 + 150 + 50);
        assert!(frame.particle_count() > 0);
    }
}
