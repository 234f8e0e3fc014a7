use std::sync::Arc;

use anyhow::{anyhow, Result};
use formulas::FormulaId;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopProxy, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::engine::{ControlInput, GpuErrorKind, Redraw, RenderEngine, RenderError};
use crate::gpu::WgpuBackend;
use crate::types::RendererConfig;

#[derive(Debug, Clone)]
pub enum WindowCommand {
    Control(ControlInput),
    Shutdown,
}

/// Thread-safe handle for feeding control edits into a running window.
#[derive(Clone)]
pub struct Controller {
    proxy: EventLoopProxy<WindowCommand>,
}

impl Controller {
    pub(crate) fn new(proxy: EventLoopProxy<WindowCommand>) -> Self {
        Self { proxy }
    }

    pub fn send(&self, input: ControlInput) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::Control(input))
            .map_err(|err| anyhow!("window is no longer running: {err}"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::Shutdown)
            .map_err(|err| anyhow!("window is no longer running: {err}"))
    }
}

/// Keyboard shortcuts understood by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Select(FormulaId),
    Exit,
}

pub(crate) fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Exit),
        Key::Character(value) => match value.as_str() {
            "1" => Some(KeyAction::Select(FormulaId::Julia)),
            "2" => Some(KeyAction::Select(FormulaId::BurningShip)),
            "3" => Some(KeyAction::Select(FormulaId::Lyapunov)),
            _ => None,
        },
        _ => None,
    }
}

/// Vertical wheel travel; positive means away from the user.
pub(crate) fn wheel_delta(delta: MouseScrollDelta) -> f64 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => f64::from(y),
        MouseScrollDelta::PixelDelta(position) => position.y,
    }
}

struct WindowState {
    window: Arc<Window>,
    engine: RenderEngine<WgpuBackend>,
    config: RendererConfig,
}

impl WindowState {
    fn new(window: Arc<Window>, config: RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let backend = WgpuBackend::new(window.clone(), size, config.power, config.vsync)?;
        let mut engine = RenderEngine::with_kernels(
            backend,
            config.kernels(),
            config.initial_view,
            config.redraw,
        );
        engine
            .start()
            .map_err(|err| anyhow!("failed to start renderer: {err}"))?;
        let state = Self {
            window,
            engine,
            config,
        };
        state.refresh_title();
        Ok(state)
    }

    fn refresh_title(&self) {
        self.window
            .set_title(&self.config.title_for(self.engine.view()));
    }

    fn handle(&mut self, result: Result<Redraw, RenderError>) {
        match result {
            Ok(Redraw::Unchanged) => {}
            Ok(Redraw::Drawn) => self.refresh_title(),
            Ok(Redraw::Scheduled) => {
                self.refresh_title();
                self.window.request_redraw();
            }
            Err(RenderError::Gpu(err)) => self.recover(err.kind, &err.to_string()),
            Err(err) => warn!("{err}"),
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.engine.backend_mut().resize(size);
        let result = self.engine.invalidate();
        self.handle(result);
    }

    fn render(&mut self) {
        if let Err(err) = self.engine.render_if_dirty() {
            match err {
                RenderError::Gpu(err) => self.recover(err.kind, &err.to_string()),
                other => warn!("{other}"),
            }
        }
    }

    fn recover(&mut self, kind: GpuErrorKind, message: &str) {
        if kind.is_surface() {
            warn!("{message}; reconfiguring surface");
            self.engine.backend_mut().reconfigure();
            if let Ok(Redraw::Scheduled) = self.engine.invalidate() {
                self.window.request_redraw();
            }
        } else {
            error!("{message}");
        }
    }
}

pub(crate) fn run_event_loop(
    event_loop: EventLoop<WindowCommand>,
    config: RendererConfig,
) -> Result<()> {
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, config)?;
    info!(view = %state.engine.view(), "window ready");

    event_loop
        .run(move |event, elwt| handle_event(&mut state, event, elwt))
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

fn handle_event(
    state: &mut WindowState,
    event: Event<WindowCommand>,
    elwt: &EventLoopWindowTarget<WindowCommand>,
) {
    match event {
        Event::UserEvent(command) => match command {
            WindowCommand::Control(input) => {
                let result = state.engine.apply(input);
                state.handle(result);
            }
            WindowCommand::Shutdown => elwt.exit(),
        },
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                match key_action(&event.logical_key) {
                    Some(KeyAction::Exit) => elwt.exit(),
                    Some(KeyAction::Select(formula)) => {
                        let result = state.engine.switch_formula(formula);
                        state.handle(result);
                    }
                    None => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let result = state.engine.pointer_moved(position.x, position.y);
                state.handle(result);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let result = state.engine.wheel(wheel_delta(delta));
                state.handle(result);
            }
            WindowEvent::Resized(new_size) => state.resize(new_size),
            WindowEvent::RedrawRequested => state.render(),
            _ => {}
        },
        Event::AboutToWait => elwt.set_control_flow(ControlFlow::Wait),
        _ => {}
    }
}
