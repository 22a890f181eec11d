// SPDX-License-Identifier: MIT OR Apache-2.0
//! Window shell and event loop.

use crate::config::{ConfigError, WindowConfig};
use crate::headless::HeadlessError;
use crate::panels::{sidebar_ui, ChatPanel, TopBar, ViewportPanel};
use crate::scene_watcher::{SceneFileEvent, SceneWatcher};
use crate::services::ServiceError;
use crate::session::Session;
use crate::theme::LabTheme;
use egui_wgpu::wgpu;
use labstage_sequencer::{DocumentError, PlaybackBar, SceneDocument};
use std::sync::Arc;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Longest frame step fed to the simulation
const MAX_FRAME_DT: f32 = 0.1;

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// Renderer initialization failed
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scene service could not be created
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Scene file could not be loaded
    #[error("Failed to load scene: {0}")]
    Document(#[from] DocumentError),

    /// Scene file could not be watched
    #[error("Failed to watch scene file: {0}")]
    Watch(#[from] notify::Error),

    /// Headless run had nothing to play
    #[error("Headless run failed: {0}")]
    Headless(#[from] HeadlessError),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| AppError::RendererInit(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| AppError::RendererInit("No suitable GPU adapter".to_string()))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("LabStage Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| AppError::RendererInit(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| AppError::RendererInit("Surface has no supported formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    #[allow(unsafe_code)] // Workaround for wgpu 23 lifetime issue with RenderPass
    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        window: &Window,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("LabStage Encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // RenderPass borrowed from the encoder must be 'static for egui_wgpu
        let encoder_ptr = Box::into_raw(Box::new(encoder));

        {
            // SAFETY: encoder_ptr comes from Box::into_raw above and is reclaimed only after render_pass is dropped
            let encoder_ref: &'static mut wgpu::CommandEncoder = unsafe { &mut *encoder_ptr };

            let mut render_pass = encoder_ref.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("LabStage Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        // SAFETY: render_pass is dropped, nothing borrows the encoder anymore
        let encoder = unsafe { Box::from_raw(encoder_ptr) };

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Panels and session shown in the window
pub struct Shell {
    session: Session,
    top_bar: TopBar,
    viewport: ViewportPanel,
    chat: ChatPanel,
    playback_bar: PlaybackBar,
    watcher: Option<SceneWatcher>,
    theme: LabTheme,
}

impl Shell {
    /// Wrap a session
    pub fn new(session: Session) -> Self {
        Self {
            session,
            top_bar: TopBar::new(),
            viewport: ViewportPanel::new(),
            chat: ChatPanel::new(),
            playback_bar: PlaybackBar::new(),
            watcher: None,
            theme: LabTheme::default(),
        }
    }

    /// Reload the scene whenever the watched file changes
    pub fn with_watcher(mut self, watcher: SceneWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Start the query box with `query`
    pub fn with_query(mut self, query: String) -> Self {
        self.top_bar.query = query;
        self
    }

    fn poll_watcher(&mut self) {
        let Some(watcher) = &self.watcher else {
            return;
        };
        match watcher.poll() {
            Some(SceneFileEvent::Changed) => match SceneDocument::load(watcher.path()) {
                Ok(document) => {
                    tracing::info!("Reloading scene from {:?}", watcher.path());
                    self.session.reload_document(Arc::new(document));
                }
                Err(e) => tracing::warn!("Keeping current scene, reload failed: {}", e),
            },
            Some(SceneFileEvent::Removed) => tracing::warn!("Scene file {:?} was removed", watcher.path()),
            Some(SceneFileEvent::Error(_)) | None => {}
        }
    }

    fn update(&mut self, ctx: &egui::Context) {
        let delta_time = ctx.input(|i| i.stable_dt).min(MAX_FRAME_DT);
        self.poll_watcher();
        self.session.frame(delta_time);
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.top_bar.ui(ui, &mut self.session);
            ui.add_space(4.0);
        });

        egui::SidePanel::right("chat")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                self.chat.ui(ui, &mut self.session);
            });

        egui::SidePanel::left("sidebar")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                sidebar_ui(ui, &self.session);
            });

        if self.session.document().is_some() {
            egui::TopBottomPanel::bottom("playback").show(ctx, |ui| {
                ui.add_space(4.0);
                self.playback_bar.ui(ui, self.session.player_mut());
                ui.add_space(4.0);
            });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.viewport.ui(ui, &mut self.session);
            });

        ctx.request_repaint();
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (space, escape, labels, home, end, left, right, stats) = ctx.input(|input| {
            (
                input.key_pressed(egui::Key::Space),
                input.key_pressed(egui::Key::Escape),
                input.key_pressed(egui::Key::L),
                input.key_pressed(egui::Key::Home),
                input.key_pressed(egui::Key::End),
                input.key_pressed(egui::Key::ArrowLeft),
                input.key_pressed(egui::Key::ArrowRight),
                input.key_pressed(egui::Key::F3),
            )
        });

        if space {
            self.session.toggle_playback();
        }
        if escape {
            self.session.pause();
        }
        if labels {
            self.session.toggle_labels();
        }
        if home {
            self.session.restart();
        }
        if end {
            let last = self.session.player().step_count().saturating_sub(1);
            self.session.scrub(last);
        }
        if left {
            self.session.player_mut().previous_step();
        }
        if right {
            self.session.player_mut().next_step();
        }
        if stats {
            self.viewport.show_stats = !self.viewport.show_stats;
        }
    }
}

/// Running state of the window
struct Running {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
}

/// Windowed application
pub struct LabApp {
    window_config: WindowConfig,
    shell: Shell,
    running: Option<Running>,
    error: Option<AppError>,
}

impl LabApp {
    /// Create the application around a shell
    pub fn new(window_config: WindowConfig, shell: Shell) -> Self {
        Self {
            window_config,
            shell,
            running: None,
            error: None,
        }
    }

    /// Open the window and run until it closes
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Running> {
        tracing::info!("Creating window...");

        let window_attrs = Window::default_attributes()
            .with_title(self.window_config.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ))
            .with_min_inner_size(winit::dpi::LogicalSize::new(960.0, 600.0));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| AppError::WindowCreation(e.to_string()))?,
        );

        tracing::info!("Initializing graphics...");
        let graphics = GraphicsState::new(window.clone())?;

        let egui_ctx = egui::Context::default();
        self.shell.theme.apply(&egui_ctx);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024), // max texture side
        );

        tracing::info!("Window size: {:?}", window.inner_size());

        Ok(Running {
            window,
            graphics,
            egui_ctx,
            egui_state,
        })
    }
}

impl ApplicationHandler for LabApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                tracing::error!("{}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!("Window resized to {:?}", new_size);
                running.graphics.resize(new_size);
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let raw_input = running.egui_state.take_egui_input(&running.window);
                let shell = &mut self.shell;
                let full_output = running.egui_ctx.run(raw_input, |ctx| {
                    shell.update(ctx);
                });

                running
                    .egui_state
                    .handle_platform_output(&running.window, full_output.platform_output.clone());

                match running.graphics.render(&running.egui_ctx, full_output, &running.window) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = running.window.inner_size();
                        running.graphics.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("Surface timeout");
                    }
                }

                running.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}
