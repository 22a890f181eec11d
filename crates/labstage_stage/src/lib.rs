// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stage composition for labstage.
//!
//! This crate turns a scene document and the current timeline step into a
//! continuously animated frame:
//! - Entity animators that approach per-step targets
//! - Fixed-pool particle effect units
//! - Environment, camera and material presentation
//! - The [`Stage`] composer that ties them together
//!
//! ## Architecture
//!
//! The step clock lives in `labstage_sequencer`. When it reports a step
//! change, call [`Stage::enter_step`]; call [`Stage::update`] every frame and
//! draw the [`Frame`] returned by [`Stage::frame`].

pub mod animator;
pub mod camera;
pub mod composer;
pub mod environment;
pub mod frame;
pub mod material;
pub mod particle;

pub use animator::{EntityAnimator, Pose, Smoothing};
pub use camera::{CameraRig, Projected, ZoomDistances};
pub use composer::{Stage, StageSettings};
pub use environment::{Environment, KeyLight, LightingPreset};
pub use frame::{EntityFrame, Frame, OverlayFrame, ParticleFrame};
pub use material::{Geometry, MaterialLook, Surface};
pub use particle::{Particle, ParticleUnit};
