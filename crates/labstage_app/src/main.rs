// SPDX-License-Identifier: MIT OR Apache-2.0
//! `LabStage` - generated science scenes with a narrated timeline.
//!
//! A query is turned into a scene document by a generation service; the
//! document is then played back step by step: entities glide to their
//! targets, particle effects start and stop, the camera reframes, and a lab
//! assistant answers questions about what is on screen.
//!
//! ## Architecture
//!
//! - `labstage_sequencer`: document model, action resolution, timeline player
//! - `labstage_stage`: particle units, entity animators, scene composition
//! - this crate: session, services, window shell and headless runner

mod app;
mod config;
mod headless;
mod panels;
mod scene_watcher;
mod services;
mod session;
mod theme;
mod worker;

use app::{LabApp, Shell};
use clap::Parser;
use config::{AppConfig, CONFIG_FILE_NAME};
use headless::HeadlessOptions;
use labstage_sequencer::SceneDocument;
use scene_watcher::SceneWatcher;
use services::GenerationMode;
use session::Session;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use worker::ServiceWorker;

/// Generated science scenes with a narrated timeline
#[derive(Parser, Debug)]
#[command(name = "labstage", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "PATH", env = "LABSTAGE_CONFIG", default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Load a scene document from a JSON file instead of generating one
    #[arg(long, value_name = "FILE")]
    scene: Option<PathBuf>,

    /// Generate a scene for this query at start-up
    #[arg(long, conflicts_with = "scene")]
    query: Option<String>,

    /// Generate a what-if remix instead of a standard scene
    #[arg(long, requires = "query")]
    remix: bool,

    /// Run the frame loop without a window
    #[arg(long)]
    headless: bool,

    /// Frames to simulate in headless mode
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Simulated frame rate in headless mode
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Reload the scene file whenever it changes
    #[arg(long, requires = "scene")]
    watch: bool,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    init_config: bool,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("labstage_app=debug,labstage_stage=info,labstage_sequencer=info,wgpu=warn,naga=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(cli: Cli) -> app::Result<()> {
    if cli.init_config {
        AppConfig::default().save(&cli.config)?;
        tracing::info!("Wrote default configuration to {:?}", cli.config);
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    let service = services::from_config(&config.generation)?;
    let worker = ServiceWorker::spawn(service)?;
    let mut session = Session::new(&config, worker);
    tracing::info!("Scene service: {}", session.service_name());

    if let Some(path) = &cli.scene {
        let document = SceneDocument::load(path)?;
        session.load_document(Arc::new(document));
    }

    if let Some(query) = &cli.query {
        let mode = if cli.remix {
            GenerationMode::WhatIfRemix
        } else {
            GenerationMode::Standard
        };
        session.submit_query(query, mode);
    }

    if cli.headless {
        let options = HeadlessOptions {
            frames: cli.frames,
            fps: cli.fps,
            generation_timeout: Duration::from_secs(config.generation.timeout_secs.saturating_add(5)),
        };
        headless::run(&mut session, options)?;
        return Ok(());
    }

    let mut shell = Shell::new(session);
    if let Some(query) = cli.query {
        shell = shell.with_query(query);
    }
    if cli.watch {
        if let Some(path) = &cli.scene {
            shell = shell.with_watcher(SceneWatcher::new(path)?);
        }
    }

    LabApp::new(config.window, shell).run()
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    tracing::info!("Starting LabStage v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        tracing::error!("LabStage failed: {e}");
        std::process::exit(1);
    }
}
