//! Platform layer: windowing & event loop.
//!
//! Owns the window, the GPU state and all per-run mutable state (camera,
//! model transform, input). Window events are translated into
//! [`InputEvent`]s; each redraw applies the input state and renders one frame.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use corelib::camera::FlyCamera;
use corelib::exercise::ExerciseConfig;
use corelib::frame::{FrameClock, FrameParams};
use corelib::input::{InputEvent, InputState, Key, KeyAction};
use corelib::transform::ModelTransform;
use renderer::{GpuState, RenderSettings, SceneAssets};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

/// Pixel-precise touchpads report scroll in pixels; this many make one wheel line.
pub const PIXELS_PER_SCROLL_LINE: f32 = 20.0;

const TITLE: &str = "Cubeview";

#[derive(Clone, Copy, Debug)]
pub struct PlatformConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
    pub exercise: ExerciseConfig,
}

/// Run the exercise until the window is closed or Escape is pressed.
pub fn run(config: PlatformConfig, assets: SceneAssets) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, assets);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    config: PlatformConfig,
    assets: SceneAssets,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    camera: FlyCamera,
    model: ModelTransform,
    input: InputState,
    clock: FrameClock,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: PlatformConfig, assets: SceneAssets) -> Self {
        Self {
            camera: config.exercise.camera,
            model: ModelTransform::default(),
            input: InputState::new(config.exercise.fly_camera),
            clock: FrameClock::new(Instant::now()),
            config,
            assets,
            window: None,
            gpu: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    /// Hide and grab the cursor; look input then switches to raw motion.
    fn capture_cursor(&mut self, window: &Window) {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match &grabbed {
            Ok(()) => window.set_cursor_visible(false),
            Err(e) => log::warn!("Cursor grab unavailable, using cursor positions: {e}"),
        }
        self.input.set_cursor_captured(grabbed.is_ok());
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let tick = self.clock.tick(Instant::now());
        self.input
            .apply_state(&mut self.camera, &mut self.model, tick.dt);

        if let (Some(fps), Some(window)) = (tick.fps, &self.window) {
            if self.config.show_fps {
                window.set_title(&format!("{TITLE} | {} | {fps:.0} FPS", self.config.exercise.exercise));
            }
            log::trace!("{fps:.1} FPS");
        }

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let frame = FrameParams::compute(
            &self.camera,
            &self.model,
            tick.elapsed,
            gpu.aspect(),
            self.config.exercise.instances,
        );

        match gpu.render(&frame) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated ({e:?}); reconfiguring");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("GPU out of memory"));
            }
            Err(e) => log::warn!("Dropped frame: {e:?}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(format!("{TITLE} | {}", self.config.exercise.exercise))
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, anyhow::anyhow!("Failed to create window: {e}")),
        };

        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let settings = RenderSettings {
            textured: self.config.exercise.textured,
            lit: self.config.exercise.lit,
        };
        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.config.backends,
            &self.assets,
            settings,
        ));
        match gpu {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => return self.fail(event_loop, e.context("Renderer initialisation failed")),
        }

        if self.config.exercise.fly_camera {
            self.capture_cursor(&window);
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    self.input.update_state(&InputEvent::FocusLost);
                } else if let (true, Some(window)) = (self.config.exercise.fly_camera, self.window.clone()) {
                    self.capture_cursor(&window);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            other => {
                if let Some(input) = translate_window_event(&other) {
                    log::trace!("Input: {input:?}");
                    self.input.update_state(&input);
                    if self.input.quit_requested() {
                        log::info!("Escape pressed. Exiting event loop.");
                        event_loop.exit();
                    }
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(input) = translate_device_event(&event) {
            self.input.update_state(&input);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn translate_window_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state,
                    repeat,
                    ..
                },
            ..
        } => Some(InputEvent::Key {
            key: translate_key(*code)?,
            action: key_action(*state, *repeat),
        }),
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::CursorMoved {
            x: position.x,
            y: position.y,
        }),
        WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Scroll {
            dy: scroll_lines(*delta),
        }),
        _ => None,
    }
}

fn translate_device_event(event: &DeviceEvent) -> Option<InputEvent> {
    match event {
        DeviceEvent::MouseMotion { delta: (dx, dy) } => Some(InputEvent::MouseMotion { dx: *dx, dy: *dy }),
        _ => None,
    }
}

fn translate_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

fn key_action(state: ElementState, repeat: bool) -> KeyAction {
    match (state, repeat) {
        (ElementState::Released, _) => KeyAction::Release,
        (ElementState::Pressed, true) => KeyAction::Repeat,
        (ElementState::Pressed, false) => KeyAction::Press,
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_LINE,
    }
}
