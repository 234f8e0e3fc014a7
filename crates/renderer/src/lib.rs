//! GPU renderer for the fractoscope formulas.
//!
//! The flow from input to pixels:
//!
//! ```text
//!   winit events / Controller
//!          │ pointer, wheel, keys, ControlInput
//!          ▼
//!   RenderEngine ──▶ ViewState ──▶ FormulaKernel::prepare_parameters
//!          │                                   │
//!          │ compile_and_link (naga)           ▼
//!          ▼                             UniformBlock (reflected offsets)
//!   GpuBackend::create_program ──▶ GpuBackend::draw ──▶ surface
//! ```
//!
//! `program` compiles and links GLSL on the CPU so diagnostics are available
//! before wgpu sees a shader. `engine` owns the view and decides when to draw.
//! `gpu` holds the wgpu implementation of the backend, and `window` wires it to
//! a winit event loop.

mod engine;
mod gpu;
mod program;
mod types;
mod uniforms;
mod window;

use anyhow::{anyhow, Result};
use winit::event_loop::{EventLoop, EventLoopBuilder};

pub use engine::{
    ControlField, ControlInput, EngineState, GpuBackend, GpuError, GpuErrorKind, Redraw,
    RedrawPolicy, RenderEngine, RenderError,
};
pub use gpu::{FormulaPipeline, QuadBuffer, WgpuBackend};
pub use program::{
    compile_and_link, compile_stage, AttributeLocation, CompiledStage, LinkedProgram,
    ProgramInterface, ShaderError, ShaderStage, UniformBlockLayout, UniformKind, UniformLocation,
    UniformSlot,
};
pub use types::{GpuPowerPreference, RendererConfig};
pub use uniforms::{FullScreenQuad, QuadVertex, UniformBlock, FULL_SCREEN_QUAD};
pub use window::{Controller, WindowCommand};

/// Entry point owning the event loop until [`Renderer::run`] is called.
pub struct Renderer {
    config: RendererConfig,
    event_loop: EventLoop<WindowCommand>,
}

impl Renderer {
    /// Creates the event loop. Must be called on the main thread.
    pub fn new(config: RendererConfig) -> Result<Self> {
        let event_loop = EventLoopBuilder::<WindowCommand>::with_user_event()
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
        Ok(Self { config, event_loop })
    }

    /// Handle for pushing control edits from other threads.
    pub fn controller(&self) -> Controller {
        Controller::new(self.event_loop.create_proxy())
    }

    /// Opens the window and blocks until it closes.
    pub fn run(self) -> Result<()> {
        window::run_event_loop(self.event_loop, self.config)
    }
}
