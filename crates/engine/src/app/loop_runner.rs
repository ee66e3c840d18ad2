use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{DrawList, InputAction, InputSnapshot, Renderer, Scene, SceneCommand, Vec2};

const FALLBACK_FRAME_DELTA: Duration = Duration::from_millis(250);
const FALLBACK_METRICS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Simulation ticks per second; every `Scene::update` advances by `1 / target_tps`.
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Wayfarer".to_string(),
            window_width: 1280,
            window_height: 800,
            target_tps: 30,
            max_frame_delta: FALLBACK_FRAME_DELTA,
            max_ticks_per_frame: 5,
            metrics_log_interval: FALLBACK_METRICS_INTERVAL,
            max_render_fps: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Runs `scene` on a fixed-step simulation clock until the window closes or
/// the scene asks to quit.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(config.window_width),
                f64::from(config.window_height),
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut clock = SimClock::new(&config, Instant::now());
    let mut latch = InputLatch::new(config.window_width, config.window_height);
    let mut metrics = MetricsAccumulator::new(
        non_zero_or(config.metrics_log_interval, FALLBACK_METRICS_INTERVAL),
        Instant::now(),
    );
    let mut draw_list = DrawList::new();
    let mut shown_title: Option<String> = None;
    let mut unloaded = false;

    scene.load();
    info!(
        target_tps = clock.tps,
        max_frame_delta_ms = clock.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = clock.max_ticks,
        render_fps_cap = %clock
            .render_cap
            .map_or_else(|| "off".to_string(), |fps| fps.to_string()),
        "loop_config"
    );

    let quit = |target: &EventLoopWindowTarget<()>, reason: &'static str| {
        info!(reason, "shutdown_requested");
        target.exit();
    };

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => quit(target, "window_close"),
                WindowEvent::Resized(size) => {
                    latch.window_size = (size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    latch.cursor = Some(Vec2::new(position.x as f32, position.y as f32));
                }
                WindowEvent::CursorLeft { .. } => latch.cursor = None,
                WindowEvent::MouseInput { state, button, .. } => latch.mouse(button, state),
                WindowEvent::KeyboardInput { event, .. } => {
                    latch.key(&event);
                    if latch.quit {
                        quit(target, "escape_key");
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame = clock.begin_frame(now);
                    for _ in 0..frame.ticks {
                        let input = latch.take_snapshot();
                        let command = scene.update(clock.tick_seconds(), &input);
                        metrics.record_tick();
                        if command == SceneCommand::Quit {
                            quit(target, "scene_quit");
                            break;
                        }
                    }
                    if !frame.dropped.is_zero() {
                        warn!(
                            dropped_backlog_ms = frame.dropped.as_millis() as u64,
                            max_ticks_per_frame = clock.max_ticks,
                            "sim_clamp_triggered"
                        );
                    }

                    let idle = clock.pacing_sleep(Instant::now());
                    if !idle.is_zero() {
                        thread::sleep(idle);
                    }

                    draw_list.clear();
                    scene.render(&mut draw_list);
                    if let Err(error) = renderer.render(&draw_list) {
                        warn!(error = %error, "renderer_draw_failed");
                        target.exit();
                    }
                    clock.mark_presented(Instant::now());
                    metrics.record_frame(frame.raw_delta);

                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            "loop_metrics"
                        );
                    }

                    let title =
                        window_title(&config.window_title, scene.debug_title(), metrics.latest().fps);
                    if shown_title.as_deref() != Some(title.as_str()) {
                        window.set_title(&title);
                        shown_title = Some(title);
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                if !unloaded {
                    scene.unload();
                    unloaded = true;
                }
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn window_title(base: &str, scene_title: Option<String>, fps: f32) -> String {
    match scene_title {
        Some(scene_title) => format!("{base} | {scene_title} | FPS: {fps:2.0}"),
        None => format!("{base} | FPS: {fps:2.0}"),
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

/// Work for one presented frame: how many fixed ticks to run and how much
/// backlog was discarded because the per-frame tick cap was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FramePlan {
    ticks: u32,
    dropped: Duration,
    raw_delta: Duration,
}

/// Fixed-step accumulator plus the optional render pacing target.
#[derive(Debug)]
struct SimClock {
    tps: u32,
    tick: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    render_cap: Option<u32>,
    accumulator: Duration,
    last_frame: Instant,
    last_present: Instant,
}

impl SimClock {
    fn new(config: &LoopConfig, now: Instant) -> Self {
        let tps = config.target_tps.max(1);
        Self {
            tps,
            tick: Duration::from_secs_f64(1.0 / f64::from(tps)),
            max_frame_delta: non_zero_or(config.max_frame_delta, FALLBACK_FRAME_DELTA),
            max_ticks: config.max_ticks_per_frame.max(1),
            render_cap: config.max_render_fps.filter(|fps| *fps > 0),
            accumulator: Duration::ZERO,
            last_frame: now,
            last_present: now,
        }
    }

    fn tick_seconds(&self) -> f32 {
        self.tick.as_secs_f32()
    }

    fn begin_frame(&mut self, now: Instant) -> FramePlan {
        let raw_delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.accumulator = self
            .accumulator
            .saturating_add(raw_delta.min(self.max_frame_delta));

        let mut ticks = 0;
        while self.accumulator >= self.tick && ticks < self.max_ticks {
            self.accumulator -= self.tick;
            ticks += 1;
        }
        let dropped = if self.accumulator >= self.tick {
            std::mem::take(&mut self.accumulator)
        } else {
            Duration::ZERO
        };
        FramePlan {
            ticks,
            dropped,
            raw_delta,
        }
    }

    fn pacing_sleep(&self, now: Instant) -> Duration {
        let Some(fps) = self.render_cap else {
            return Duration::ZERO;
        };
        let budget = Duration::from_secs_f64(1.0 / f64::from(fps));
        budget.saturating_sub(now.saturating_duration_since(self.last_present))
    }

    fn mark_presented(&mut self, now: Instant) {
        self.last_present = now;
    }
}

/// Press edges for a held button: a press only counts once until released.
#[derive(Debug, Default, Clone, Copy)]
struct EdgeButton {
    down: bool,
    pressed: bool,
}

impl EdgeButton {
    fn apply(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.pressed |= !self.down;
                self.down = true;
            }
            ElementState::Released => self.down = false,
        }
    }

    fn take_pressed(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }
}

/// Accumulates window events between ticks and hands each tick one snapshot.
#[derive(Debug, Default)]
struct InputLatch {
    quit: bool,
    actions: ActionStates,
    menu_key: EdgeButton,
    left_mouse: EdgeButton,
    right_mouse: EdgeButton,
    cursor: Option<Vec2>,
    window_size: (u32, u32),
}

impl InputLatch {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_size: (window_width, window_height),
            ..Self::default()
        }
    }

    fn key(&mut self, event: &KeyEvent) {
        self.physical_key(event.physical_key, event.state);
    }

    fn physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let pressed = state == ElementState::Pressed;
        let action = match code {
            KeyCode::Tab => {
                self.menu_key.apply(state);
                return;
            }
            KeyCode::KeyW | KeyCode::ArrowUp => InputAction::MoveUp,
            KeyCode::KeyA | KeyCode::ArrowLeft => InputAction::MoveLeft,
            KeyCode::KeyS | KeyCode::ArrowDown => InputAction::MoveDown,
            KeyCode::KeyD | KeyCode::ArrowRight => InputAction::MoveRight,
            KeyCode::Space => InputAction::Attack,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => InputAction::Sprint,
            KeyCode::Escape => {
                self.quit |= pressed;
                InputAction::Quit
            }
            _ => return,
        };
        self.actions.set(action, pressed);
    }

    fn mouse(&mut self, button: MouseButton, state: ElementState) {
        match button {
            MouseButton::Left => self.left_mouse.apply(state),
            MouseButton::Right => self.right_mouse.apply(state),
            _ => {}
        }
    }

    fn take_snapshot(&mut self) -> InputSnapshot {
        let (width, height) = self.window_size;
        InputSnapshot::new(
            self.quit,
            self.menu_key.take_pressed(),
            self.actions,
            self.cursor,
            self.left_mouse.take_pressed(),
            self.right_mouse.take_pressed(),
            width,
            height,
        )
    }
}
