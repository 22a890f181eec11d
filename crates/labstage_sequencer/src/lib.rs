// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene documents and step timeline playback for labstage.
//!
//! This crate provides:
//! - The scene document model as emitted by the generation service
//! - Target value and color parsing
//! - Per-step action resolution with a configurable duplicate policy
//! - The step timeline player
//! - An egui playback bar
//!
//! ## Architecture
//!
//! A [`SceneDocument`] is immutable and shared behind an `Arc`. The
//! [`TimelinePlayer`] owns the discrete step clock; each time the current step
//! changes, the stage resolves that step once into [`StepBindings`] and
//! animates toward them frame by frame.

pub mod action;
pub mod document;
pub mod player;
pub mod ui;
pub mod value;

pub use action::{ActionSet, DuplicatePolicy, ParticleSignal, Property, StepBindings};
pub use document::{
    ActionKind, AssetKind, CameraZoom, Density, DocumentError, EffectKind, LabAssistantConfig,
    MaterialClass, MetaData, PbrMaterial, PostProcessing, SceneDocument, SpeedTier, StageAsset,
    TimelineStep, Transform, UiDisplay, UiOverlay, VfxAsset, VfxConfig, VisualAction,
    VisualEvents, VisualSettings,
};
pub use player::{PlaybackState, PlayerEvent, PlayerState, RearmPolicy, TimelinePlayer};
pub use ui::{PlaybackBar, PlaybackBarStyle};
pub use value::{Interpolation, Rgb, TargetValue};
