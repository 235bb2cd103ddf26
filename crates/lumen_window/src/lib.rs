use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_core::FramePacer;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    error::{EventLoopError, OsError},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Target frame rate of the runner.
pub const TARGET_FPS: f32 = 60.0;

/// The OS window. Shared so a GPU surface can hold on to it.
pub struct MainWindow(pub Arc<Window>);

pub type HostError = Box<dyn Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] EventLoopError),

    #[error("could not create window: {0}")]
    Create(#[from] OsError),

    #[error("host failed to initialise: {0}")]
    Host(#[source] HostError),
}

/// What the runner should do after a host callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Application side of the event loop.
pub trait WindowHost {
    /// Called once, right after the window exists.
    fn init(&mut self, window: &MainWindow) -> Result<(), HostError>;

    fn key_released(&mut self, key: KeyCode) -> Flow;

    /// Cursor movement in pixels while the left button is held.
    fn mouse_dragged(&mut self, _dx: f64, _dy: f64) {}

    fn resized(&mut self, _width: u32, _height: u32) {}

    /// `frame_delta` is the time since the previous rendered frame.
    fn redraw(&mut self, frame_delta: Duration);
}

#[derive(Clone, Debug)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Lumen".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Turns absolute cursor positions into drag deltas.
#[derive(Debug, Default)]
pub struct MouseDrag {
    held: bool,
    last: Option<(f64, f64)>,
}

impl MouseDrag {
    pub fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    /// Delta since the previous position, only while held.
    pub fn moved(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
        let previous = self.last.replace((x, y));
        if !self.held {
            return None;
        }
        previous.map(|(px, py)| (x - px, y - py))
    }
}

// Holds the host while waiting for the OS to hand us a window
struct LumenRunner<H: WindowHost> {
    host: H,
    settings: WindowSettings,
    window: Option<MainWindow>,
    pacer: FramePacer,
    drag: MouseDrag,
    error: Option<WindowError>,
}

impl<H: WindowHost> LumenRunner<H> {
    fn new(host: H, settings: WindowSettings) -> Self {
        Self {
            host,
            settings,
            window: None,
            pacer: FramePacer::new(TARGET_FPS),
            drag: MouseDrag::default(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: WindowError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl<H: WindowHost> ApplicationHandler for LumenRunner<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(PhysicalSize::new(self.settings.width, self.settings.height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => MainWindow(Arc::new(window)),
            Err(err) => return self.fail(event_loop, err.into()),
        };

        if let Err(err) = self.host.init(&window) {
            return self.fail(event_loop, WindowError::Host(err));
        }
        self.window = Some(window);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };

        let now = Instant::now();
        if self.pacer.should_render(now) {
            window.0.request_redraw();
        }
        let deadline = self.pacer.next_deadline().unwrap_or(now);
        event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Released,
                        ..
                    },
                ..
            } => {
                if self.host.key_released(code) == Flow::Exit {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.drag.set_held(state == ElementState::Pressed),
            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                if let Some((dx, dy)) = self.drag.moved(x, y) {
                    self.host.mouse_dragged(dx, dy);
                }
            }
            WindowEvent::Resized(size) => self.host.resized(size.width, size.height),
            WindowEvent::CloseRequested => {
                log::info!("close requested; stopping");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.host.redraw(self.pacer.frame_delta());
            }
            _ => (),
        }
    }
}

/// Opens the window and drives `host` until the window closes.
pub fn run_lumen_app<H: WindowHost>(host: H, settings: WindowSettings) -> Result<(), WindowError> {
    let event_loop = EventLoop::new()?;
    // Woken by the frame pacer, not polled
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = LumenRunner::new(host, settings);
    event_loop.run_app(&mut runner)?;

    match runner.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_needs_held_button() {
        let mut drag = MouseDrag::default();
        assert_eq!(drag.moved(10.0, 10.0), None);
        assert_eq!(drag.moved(20.0, 15.0), None);
    }

    #[test]
    fn drag_reports_delta_from_last_position() {
        let mut drag = MouseDrag::default();
        drag.moved(10.0, 10.0);
        drag.set_held(true);
        assert_eq!(drag.moved(13.0, 6.0), Some((3.0, -4.0)));
        assert_eq!(drag.moved(13.0, 7.0), Some((0.0, 1.0)));
    }

    #[test]
    fn first_move_after_press_without_history_is_ignored() {
        let mut drag = MouseDrag::default();
        drag.set_held(true);
        assert_eq!(drag.moved(5.0, 5.0), None);
        assert_eq!(drag.moved(6.0, 5.0), Some((1.0, 0.0)));
    }
}
