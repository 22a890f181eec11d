// SPDX-License-Identifier: MIT OR Apache-2.0
//! Particle effect units.
//!
//! Each [`ParticleUnit`] owns a fixed arena of [`Particle`] slots sized by the
//! effect's density tier. Slots are never allocated or freed after
//! construction: a particle whose life runs out is reset in place in the same
//! frame, using the reset rule for the unit's [`EffectKind`].
//!
//! When emission is stopped, dead slots are no longer recycled and stay
//! dormant (life 0, not rendered) until emission resumes. Slots revived on
//! resume get a random life, like a freshly built unit, so they do not all
//! expire together.

use fastrand::Rng;
use labstage_sequencer::{EffectKind, Rgb, VfxAsset};
use std::f32::consts::PI;

/// Gravity applied to sparks
const GRAVITY: f32 = 9.8;
/// Base point size before the scale multiplier
const BASE_POINT_SIZE: f32 = 0.2;
/// Opacity of rendered points
pub const POINT_OPACITY: f32 = 0.8;

/// One point particle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// Position relative to the unit origin
    pub position: [f32; 3],
    /// Velocity in units per second
    pub velocity: [f32; 3],
    /// Remaining life in [0, 1]
    pub life: f32,
    /// Relative size
    pub size: f32,
}

impl Particle {
    /// Whether the slot holds a visible particle
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Sample a random f32 in the range [min, max]
#[inline]
fn random_f32_range(rng: &mut Rng, min: f32, max: f32) -> f32 {
    let range = max - min;
    if range < f32::EPSILON {
        return min;
    }
    min + rng.f32() * range
}

/// Uniform sample in [-half, half]
#[inline]
fn spread(rng: &mut Rng, half: f32) -> f32 {
    random_f32_range(rng, -half, half)
}

/// Stable seed derived from an effect id (FNV-1a)
pub fn seed_for(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Fixed-capacity particle pool for one effect instance
#[derive(Debug)]
pub struct ParticleUnit {
    id: String,
    kind: EffectKind,
    color: Rgb,
    speed: f32,
    scale: f32,
    offset: [f32; 3],
    parent: Option<String>,
    particles: Box<[Particle]>,
    rng: Rng,
    elapsed: f32,
    emitting: bool,
    resumed: bool,
}

impl ParticleUnit {
    /// Build a unit for an effect, seeded from its id
    pub fn new(vfx: &VfxAsset) -> Self {
        Self::with_seed(vfx, seed_for(&vfx.id))
    }

    /// Build a unit with an explicit RNG seed
    pub fn with_seed(vfx: &VfxAsset, seed: u64) -> Self {
        let count = vfx.config.density.particle_count();
        let mut unit = Self {
            id: vfx.id.clone(),
            kind: vfx.effect_type,
            color: vfx.config.rgb(),
            speed: vfx.config.speed.multiplier(),
            scale: vfx.config.scale(),
            offset: vfx.offset(),
            parent: vfx.parent_actor_id.clone(),
            particles: vec![Particle::default(); count].into_boxed_slice(),
            rng: Rng::with_seed(seed),
            elapsed: 0.0,
            emitting: true,
            resumed: false,
        };
        for i in 0..count {
            unit.reset(i, true);
        }
        unit
    }

    /// Decay rate of particle life per second, before the speed multiplier
    fn decay(&self) -> f32 {
        match self.kind {
            EffectKind::Sparks => 2.0,
            _ => 0.5,
        }
    }

    /// Reset one slot according to the effect kind
    fn reset(&mut self, i: usize, initial: bool) {
        let scale = self.scale;
        let rng = &mut self.rng;
        let mut p = Particle {
            position: [
                spread(rng, 0.25 * scale),
                spread(rng, 0.25 * scale),
                spread(rng, 0.25 * scale),
            ],
            velocity: [0.0; 3],
            life: if initial { rng.f32() } else { 1.0 },
            size: 1.0,
        };

        match self.kind {
            EffectKind::Fire => {
                p.position[1] = 0.0;
                p.velocity = [spread(rng, 0.1), random_f32_range(rng, 1.0, 3.0), spread(rng, 0.1)];
                p.size = random_f32_range(rng, 0.5, 1.0);
            }
            EffectKind::Smoke => {
                p.position[1] = 0.0;
                p.velocity = [spread(rng, 0.25), random_f32_range(rng, 0.5, 1.5), spread(rng, 0.25)];
                p.size = random_f32_range(rng, 1.0, 2.0);
            }
            EffectKind::Sparks => {
                p.position = [0.0; 3];
                let theta = random_f32_range(rng, 0.0, 2.0 * PI);
                let phi = random_f32_range(rng, 0.0, PI);
                let speed = random_f32_range(rng, 2.0, 7.0);
                p.velocity = [
                    speed * phi.sin() * theta.cos(),
                    speed * phi.cos(),
                    speed * phi.sin() * theta.sin(),
                ];
                p.size = random_f32_range(rng, 0.1, 0.3);
            }
            EffectKind::Bubbles => {
                p.position = [spread(rng, 0.5 * scale), spread(rng, 0.5 * scale), spread(rng, 0.5 * scale)];
                p.velocity = [0.0, random_f32_range(rng, 0.2, 0.7), 0.0];
                p.size = random_f32_range(rng, 0.1, 0.3);
            }
            EffectKind::Fog => {
                p.position = [spread(rng, 5.0 * scale), spread(rng, scale), spread(rng, 5.0 * scale)];
                p.velocity = [spread(rng, 0.05), 0.0, spread(rng, 0.05)];
                p.size = random_f32_range(rng, 2.0, 4.0);
            }
            EffectKind::LiquidWave => {
                p.position = [spread(rng, 0.5 * scale), 0.0, spread(rng, 0.5 * scale)];
                p.size = random_f32_range(rng, 0.15, 0.3);
            }
            EffectKind::Unknown => {
                p.velocity = [0.0, 0.5, 0.0];
            }
        }

        self.particles[i] = p;
    }

    /// Advance every slot by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        let dt = delta_time.max(0.0);
        self.elapsed += dt;
        let speed = self.speed;
        let decay = self.decay();
        let (kind, elapsed, scale) = (self.kind, self.elapsed, self.scale);
        let revive_staggered = std::mem::take(&mut self.resumed);

        for i in 0..self.particles.len() {
            if !self.particles[i].is_alive() {
                if self.emitting {
                    self.reset(i, revive_staggered);
                }
                continue;
            }

            let p = &mut self.particles[i];
            p.life -= dt * speed * decay;
            if p.life <= 0.0 {
                if self.emitting {
                    self.reset(i, false);
                } else {
                    self.particles[i].life = 0.0;
                }
                continue;
            }

            for axis in 0..3 {
                p.position[axis] += p.velocity[axis] * dt * speed;
            }

            match kind {
                EffectKind::Sparks => p.velocity[1] -= GRAVITY * dt * 0.5,
                EffectKind::Bubbles => p.position[0] += (elapsed * 5.0 + i as f32).sin() * 0.01,
                EffectKind::LiquidWave => {
                    p.position[1] =
                        (elapsed * 3.0 + (p.position[0] + p.position[2]) * 4.0).sin() * 0.05 * scale;
                }
                _ => {}
            }
        }
    }

    /// Start or stop recycling dead slots
    pub fn set_emitting(&mut self, emitting: bool) {
        if self.emitting != emitting {
            tracing::debug!(
                "Effect '{}' {}",
                self.id,
                if emitting { "started" } else { "stopped" }
            );
        }
        if !emitting {
            self.resumed = false;
        } else if !self.emitting {
            self.resumed = true;
        }
        self.emitting = emitting;
    }

    /// Whether dead slots are recycled
    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    /// All slots, including dormant ones
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Slots holding a visible particle
    pub fn live_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_alive())
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Effect id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Effect kind
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Particle color
    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Rendered point size
    pub fn point_size(&self) -> f32 {
        BASE_POINT_SIZE * self.scale
    }

    /// Offset from the parent or scene origin
    pub fn offset(&self) -> [f32; 3] {
        self.offset
    }

    /// Parent entity id
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vfx(kind: &str, density: &str, speed: &str) -> VfxAsset {
        serde_json::from_value(json!({
            "id": format!("{kind}-unit"),
            "effect_type": kind,
            "config": { "color": "#ffaa00", "density": density, "speed": speed, "scale_multiplier": 1.5 }
        }))
        .unwrap()
    }

    #[test]
    fn test_pool_sizes() {
        assert_eq!(ParticleUnit::new(&vfx("SPARKS", "HIGH", "FAST")).capacity(), 300);
        assert_eq!(ParticleUnit::new(&vfx("FIRE", "MEDIUM", "SLOW")).capacity(), 150);
        assert_eq!(ParticleUnit::new(&vfx("FOG", "LOW", "SLOW")).capacity(), 50);
        assert_eq!(ParticleUnit::new(&vfx("SMOKE", "NONE", "SLOW")).capacity(), 50);
    }

    #[test]
    fn test_pool_size_constant_across_frames() {
        let mut unit = ParticleUnit::new(&vfx("SPARKS", "HIGH", "FAST"));
        for _ in 0..1000 {
            unit.update(1.0 / 60.0);
        }
        assert_eq!(unit.capacity(), 300);
        assert_eq!(unit.particles().len(), 300);
    }

    #[test]
    fn test_initial_life_in_unit_range() {
        let unit = ParticleUnit::new(&vfx("FIRE", "HIGH", "SLOW"));
        assert!(unit.particles().iter().all(|p| (0.0..=1.0).contains(&p.life)));
    }

    #[test]
    fn test_sparks_reset_speed_bounds() {
        let mut unit = ParticleUnit::new(&vfx("SPARKS", "HIGH", "FAST"));
        let check = |unit: &ParticleUnit| {
            for p in unit.particles() {
                let [x, y, z] = p.velocity;
                let speed = (x * x + y * y + z * z).sqrt();
                assert!((2.0 - 1e-3..=7.0 + 1e-3).contains(&speed), "speed {speed}");
                assert_eq!(p.position, [0.0; 3]);
            }
        };
        check(&unit);

        // Force every slot through an in-place reset
        for p in unit.particles.iter_mut() {
            p.life = 1e-6;
        }
        unit.update(0.01);
        check(&unit);
        assert!(unit.particles().iter().all(|p| p.life == 1.0));
    }

    #[test]
    fn test_deterministic_per_id() {
        let a = ParticleUnit::new(&vfx("SMOKE", "LOW", "SLOW"));
        let b = ParticleUnit::new(&vfx("SMOKE", "LOW", "SLOW"));
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn test_stop_leaves_dead_slots_dormant() {
        let mut unit = ParticleUnit::new(&vfx("FIRE", "LOW", "FAST"));
        unit.set_emitting(false);
        // FAST fire loses 1.0 life per second
        for _ in 0..120 {
            unit.update(1.0 / 60.0);
        }
        assert_eq!(unit.live_particles().count(), 0);
        assert_eq!(unit.capacity(), 50);

        unit.set_emitting(true);
        unit.update(1.0 / 60.0);
        assert_eq!(unit.capacity(), 50);
        assert!(unit.live_particles().count() >= 45);

        // Revived slots are staggered, not all at full life
        let lives: Vec<f32> = unit.particles().iter().map(|p| p.life).collect();
        assert!(lives.iter().any(|&l| l < 0.9));
        assert!(lives.iter().any(|&l| l > 0.1));

        // Later recycling after the resume is back to full life
        for p in unit.particles.iter_mut() {
            p.life = 1e-6;
        }
        unit.update(0.01);
        assert!(unit.particles().iter().all(|p| p.life == 1.0));
    }

    #[test]
    fn test_resume_does_not_pulse() {
        let mut unit = ParticleUnit::new(&vfx("FIRE", "LOW", "FAST"));
        unit.set_emitting(false);
        for _ in 0..120 {
            unit.update(1.0 / 60.0);
        }
        unit.set_emitting(true);
        unit.update(1.0 / 60.0);

        // A second of FAST fire: slots expire spread across frames
        let mut expiring_frames = 0;
        for _ in 0..60 {
            let before: Vec<f32> = unit.particles().iter().map(|p| p.life).collect();
            unit.update(1.0 / 60.0);
            if unit.particles().iter().zip(&before).any(|(p, &old)| p.life > old) {
                expiring_frames += 1;
            }
        }
        assert!(expiring_frames > 10, "only {expiring_frames} frames recycled");
    }

    #[test]
    fn test_liquid_wave_surface_bound() {
        let mut unit = ParticleUnit::new(&vfx("LIQUID_WAVE", "MEDIUM", "SLOW"));
        for _ in 0..300 {
            unit.update(1.0 / 60.0);
            for p in unit.particles() {
                assert!(p.position[1].abs() <= 0.05 * 1.5 + 1e-5);
                assert!(p.position[0].abs() <= 0.5 * 1.5 + 1e-5);
            }
        }
    }

    #[test]
    fn test_sparks_fall_under_gravity() {
        let mut unit = ParticleUnit::new(&vfx("SPARKS", "LOW", "SLOW"));
        for p in unit.particles.iter_mut() {
            p.life = 1.0;
        }
        let before: Vec<f32> = unit.particles().iter().map(|p| p.velocity[1]).collect();
        unit.update(0.1);
        for (p, vy) in unit.particles().iter().zip(before) {
            assert!((p.velocity[1] - (vy - 9.8 * 0.1 * 0.5)).abs() < 1e-4);
        }
    }
}
