use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::WindowBuilder;

use crate::assets::AssetCache;
use crate::{AppPaths, StartupError};

use super::config::{ConfigError, LoopConfig};
use super::keyboard::InputCollector;
use super::metrics::{MetricsAccumulator, MetricsHandle};
use super::rendering::Renderer;
use super::scene::{Scene, SceneCommand, SceneRunner};
use super::timing::{self, FixedStep, FramePacer};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(paths: &AppPaths, config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(paths, config, scene, MetricsHandle::default())
}

/// Opens the window, loads `scene` and drives it at a fixed tick rate until
/// the window closes or the scene asks to quit.
pub fn run_app_with_metrics(
    paths: &AppPaths,
    config: LoopConfig,
    scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    info!(
        root = %paths.root.display(),
        assets_dir = %paths.assets_dir.display(),
        config_path = %paths.config_path.display(),
        "startup"
    );

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(LogicalSize::new(
            f64::from(config.window_width),
            f64::from(config.window_height),
        ))
        .build(&event_loop)
        .map_err(AppError::CreateWindow)?;
    let renderer =
        Renderer::new(Arc::new(window), config.clear_color).map_err(AppError::CreateRenderer)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut state = LoopState::new(paths, config, scene, renderer, metrics_handle);
    event_loop
        .run(move |event, target| state.handle(event, target))
        .map_err(AppError::EventLoopRun)
}

/// Everything the event loop closure owns between callbacks.
struct LoopState {
    config: LoopConfig,
    renderer: Renderer,
    runner: SceneRunner,
    assets: AssetCache,
    input: InputCollector,
    clock: FixedStep,
    pacer: FramePacer,
    slow_frame: Duration,
    last_frame: Instant,
    metrics: MetricsAccumulator,
    metrics_handle: MetricsHandle,
    shown_title: Option<String>,
}

impl LoopState {
    fn new(
        paths: &AppPaths,
        config: LoopConfig,
        scene: Box<dyn Scene>,
        renderer: Renderer,
        metrics_handle: MetricsHandle,
    ) -> Self {
        let clock = FixedStep::from_config(&config);
        let pacer = FramePacer::new(config.max_render_fps);
        let slow_frame = timing::slow_frame_delay(config.simulated_slow_frame_ms);
        let metrics_interval = timing::metrics_interval(&config);
        info!(
            tick_ms = clock.step().as_secs_f64() * 1000.0,
            max_frame_delta_ms = clock.max_frame_delta().as_millis() as u64,
            max_ticks_per_frame = clock.max_ticks(),
            metrics_interval_ms = metrics_interval.as_millis() as u64,
            slow_frame_ms = slow_frame.as_millis() as u64,
            render_fps_cap = %pacer.describe(),
            "loop_config"
        );

        let mut assets = AssetCache::new(paths.assets_dir.clone());
        let mut runner = SceneRunner::new(scene);
        runner.load(&mut assets);

        Self {
            input: InputCollector::new(config.window_width, config.window_height),
            config,
            renderer,
            runner,
            assets,
            clock,
            pacer,
            slow_frame,
            last_frame: Instant::now(),
            metrics: MetricsAccumulator::new(metrics_interval),
            metrics_handle,
            shown_title: None,
        }
    }

    fn handle(&mut self, event: Event<()>, target: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { window_id, event } if window_id == self.renderer.window().id() => {
                self.window_event(event, target);
            }
            Event::AboutToWait => self.renderer.window().request_redraw(),
            Event::LoopExiting => {
                self.runner.shutdown();
                self.assets.clear();
                info!("shutdown");
            }
            _ => {}
        }
    }

    fn window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => {
                self.input.request_quit();
                info!(reason = "window_close", "shutdown_requested");
                target.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height, target),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.renderer.window().inner_size();
                self.resize(size.width, size.height, target);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => self.input.cursor_left(),
            WindowEvent::KeyboardInput { event, .. } => {
                self.input.key(event.physical_key, event.state);
                if self.input.quit_requested() {
                    info!(reason = "quit_key", "shutdown_requested");
                    target.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(reason) = self.frame() {
                    info!(reason, "shutdown_requested");
                    target.exit();
                }
            }
            _ => {}
        }
    }

    fn resize(&mut self, width: u32, height: u32, target: &EventLoopWindowTarget<()>) {
        self.input.resized(width, height);
        if let Err(error) = self.renderer.resize(width, height) {
            warn!(error = %error, "renderer_resize_failed");
            target.exit();
        }
    }

    /// One redraw: run owed ticks, then present. Returns why the loop
    /// should stop, if it should.
    fn frame(&mut self) -> Option<&'static str> {
        if !self.slow_frame.is_zero() {
            thread::sleep(self.slow_frame);
        }
        let now = Instant::now();
        let frame_dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        let plan = self.clock.advance(frame_dt);
        let fixed_dt_seconds = self.clock.step().as_secs_f32();
        for _ in 0..plan.ticks {
            let snapshot = self.input.next_snapshot();
            let command = self.runner.tick(fixed_dt_seconds, &snapshot);
            self.metrics.record_tick();
            if command == SceneCommand::Quit {
                return Some("scene_command");
            }
        }
        if !plan.dropped.is_zero() {
            self.metrics.record_dropped_backlog(plan.dropped);
            warn!(
                dropped_backlog_ms = plan.dropped.as_millis() as u64,
                max_ticks_per_frame = self.clock.max_ticks(),
                "sim_clamp_triggered"
            );
        }

        self.pacer.pace();
        if let Err(error) = self.renderer.render_world(self.runner.world_mut()) {
            warn!(error = %error, "renderer_draw_failed");
            return Some("render_failure");
        }
        self.pacer.presented();

        self.refresh_title();
        self.metrics.record_frame(frame_dt);
        self.publish_metrics(now);
        None
    }

    fn refresh_title(&mut self) {
        let title = self.runner.debug_title();
        if title == self.shown_title {
            return;
        }
        let window = self.renderer.window();
        window.set_title(title.as_deref().unwrap_or(&self.config.window_title));
        self.shown_title = title;
    }

    fn publish_metrics(&mut self, now: Instant) {
        let world = self.runner.world();
        let Some(snapshot) = self.metrics.maybe_snapshot(now, world.live_count()) else {
            return;
        };
        self.metrics_handle.publish(snapshot);
        info!(
            fps = snapshot.fps,
            tps = snapshot.tps,
            frame_time_ms = snapshot.frame_time_ms,
            live_entities = snapshot.live_entities,
            dropped_backlog_ms = snapshot.dropped_backlog_ms,
            tick = world.tick_count(),
            "loop_metrics"
        );
    }
}
