//! Render loop and view-state ownership.
//!
//! `RenderEngine` is the only writer of [`ViewState`]. Input handlers mutate
//! the view, then either draw straight away or mark the engine dirty so the
//! host can coalesce several events into one frame. Programs are compiled on
//! first use and cached per formula; the full-screen quad is uploaded once.
//!
//! GPU access goes through [`GpuBackend`] so the loop can be driven against a
//! recording double in tests and against wgpu in the window.

use std::collections::HashMap;
use std::fmt;

use formulas::{
    view, FormulaId, KernelSet, UnknownFormulaError, ViewState, Viewport, WheelDirection,
};

use crate::program::{compile_and_link, LinkedProgram, ProgramInterface, ShaderError};
use crate::uniforms::{FullScreenQuad, UniformBlock, FULL_SCREEN_QUAD};

/// Failure category reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuErrorKind {
    Validation,
    OutOfMemory,
    SurfaceLost,
    SurfaceOutdated,
    SurfaceTimeout,
    Internal,
}

impl GpuErrorKind {
    /// Surface problems that a reconfigure usually clears.
    pub fn is_surface(self) -> bool {
        matches!(
            self,
            GpuErrorKind::SurfaceLost | GpuErrorKind::SurfaceOutdated | GpuErrorKind::SurfaceTimeout
        )
    }
}

impl fmt::Display for GpuErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GpuErrorKind::Validation => "validation",
            GpuErrorKind::OutOfMemory => "out-of-memory",
            GpuErrorKind::SurfaceLost => "surface-lost",
            GpuErrorKind::SurfaceOutdated => "surface-outdated",
            GpuErrorKind::SurfaceTimeout => "surface-timeout",
            GpuErrorKind::Internal => "internal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("GPU {kind} error: {message}")]
pub struct GpuError {
    pub kind: GpuErrorKind,
    pub message: String,
}

impl GpuError {
    pub fn new(kind: GpuErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Which numeric control a text value was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    CenterX,
    CenterY,
    Scale,
}

impl fmt::Display for ControlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlField::CenterX => f.write_str("center-x"),
            ControlField::CenterY => f.write_str("center-y"),
            ControlField::Scale => f.write_str("scale"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    UnknownFormula(#[from] UnknownFormulaError),
    #[error("ignored {field} input '{raw}': not a finite number")]
    InvalidInput { field: ControlField, raw: String },
}

/// A control-panel style edit expressed as raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlInput {
    Formula(String),
    CenterX(String),
    CenterY(String),
    Scale(String),
}

/// The GPU operations the render loop needs.
pub trait GpuBackend {
    type Program;
    type Geometry;

    /// Current drawable size in device pixels.
    fn viewport(&self) -> Viewport;

    fn create_program(
        &mut self,
        formula: FormulaId,
        linked: &LinkedProgram,
    ) -> Result<Self::Program, ShaderError>;

    fn upload_geometry(&mut self, quad: &FullScreenQuad) -> Result<Self::Geometry, GpuError>;

    /// Clears the target and draws the quad with `program`.
    fn draw(
        &mut self,
        program: &Self::Program,
        geometry: &Self::Geometry,
        uniforms: Option<&UniformBlock>,
    ) -> Result<(), GpuError>;
}

/// A cached program plus the reflected interface used to fill its uniforms.
struct ShaderProgram<P> {
    handle: P,
    interface: ProgramInterface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Ready { formula: FormulaId },
}

/// When a mutation turns into a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedrawPolicy {
    /// Draw inside the input handler.
    Immediate,
    /// Mark dirty and let the host call [`RenderEngine::render_if_dirty`].
    #[default]
    Coalesced,
}

/// What an input handler did with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    Drawn,
    Scheduled,
    Unchanged,
}

pub struct RenderEngine<B: GpuBackend> {
    backend: B,
    kernels: KernelSet,
    view: ViewState,
    state: EngineState,
    policy: RedrawPolicy,
    programs: HashMap<FormulaId, ShaderProgram<B::Program>>,
    geometry: Option<B::Geometry>,
    dirty: bool,
    frames: u64,
}

impl<B: GpuBackend> RenderEngine<B> {
    pub fn new(backend: B, view: ViewState, policy: RedrawPolicy) -> Self {
        Self::with_kernels(backend, KernelSet::builtin(), view, policy)
    }

    pub fn with_kernels(
        backend: B,
        kernels: KernelSet,
        view: ViewState,
        policy: RedrawPolicy,
    ) -> Self {
        Self {
            backend,
            kernels,
            view,
            state: EngineState::Idle,
            policy,
            programs: HashMap::new(),
            geometry: None,
            dirty: true,
            frames: 0,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Compiles the initial formula, uploads the quad and draws the first
    /// frame. Calling it again on a ready engine just redraws.
    pub fn start(&mut self) -> Result<(), RenderError> {
        if let EngineState::Ready { .. } = self.state {
            return self.redraw();
        }
        let formula = self.view.formula();
        self.ensure_program(formula)?;
        self.ensure_geometry()?;
        self.state = EngineState::Ready { formula };
        tracing::info!(%formula, "render engine ready");
        self.redraw()
    }

    /// Draws the current view unconditionally.
    pub fn redraw(&mut self) -> Result<(), RenderError> {
        self.draw_current().map(|_| ())
    }

    /// Draws if any mutation happened since the last frame.
    pub fn render_if_dirty(&mut self) -> Result<bool, RenderError> {
        if !self.dirty {
            return Ok(false);
        }
        self.draw_current()
    }

    /// Flags the frame stale after something outside the view changed, such
    /// as the surface size.
    pub fn invalidate(&mut self) -> Result<Redraw, RenderError> {
        self.after_mutation()
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64) -> Result<Redraw, RenderError> {
        let viewport = self.backend.viewport();
        if !self.view.pointer_moved(x, y, viewport) {
            return Ok(Redraw::Unchanged);
        }
        self.after_mutation()
    }

    pub fn wheel(&mut self, delta: f64) -> Result<Redraw, RenderError> {
        let Some(direction) = WheelDirection::from_delta(delta) else {
            return Ok(Redraw::Unchanged);
        };
        self.view.wheel(direction);
        self.after_mutation()
    }

    pub fn set_center_x(&mut self, raw: &str) -> Result<Redraw, RenderError> {
        let value = numeric(ControlField::CenterX, raw)?;
        self.view.set_center_x(value);
        self.after_mutation()
    }

    pub fn set_center_y(&mut self, raw: &str) -> Result<Redraw, RenderError> {
        let value = numeric(ControlField::CenterY, raw)?;
        self.view.set_center_y(value);
        self.after_mutation()
    }

    pub fn set_scale(&mut self, raw: &str) -> Result<Redraw, RenderError> {
        let value = numeric(ControlField::Scale, raw)?;
        self.view.set_scale(value);
        self.after_mutation()
    }

    pub fn select_formula(&mut self, raw: &str) -> Result<Redraw, RenderError> {
        let formula = raw.parse::<FormulaId>()?;
        self.switch_formula(formula)
    }

    /// Makes `formula` active. If its program fails to build the previous
    /// formula, program and frame stay in place.
    pub fn switch_formula(&mut self, formula: FormulaId) -> Result<Redraw, RenderError> {
        if let EngineState::Ready { formula: current } = self.state {
            if let Err(err) = self.ensure_program(formula) {
                tracing::warn!(%formula, %current, "keeping previous formula: {err}");
                return Err(err);
            }
            if current != formula {
                tracing::info!(from = %current, to = %formula, "switched formula");
            }
            self.state = EngineState::Ready { formula };
        }
        self.view.set_formula(formula);
        self.after_mutation()
    }

    pub fn apply(&mut self, input: ControlInput) -> Result<Redraw, RenderError> {
        match input {
            ControlInput::Formula(raw) => self.select_formula(&raw),
            ControlInput::CenterX(raw) => self.set_center_x(&raw),
            ControlInput::CenterY(raw) => self.set_center_y(&raw),
            ControlInput::Scale(raw) => self.set_scale(&raw),
        }
    }

    fn after_mutation(&mut self) -> Result<Redraw, RenderError> {
        self.dirty = true;
        match (self.state, self.policy) {
            (EngineState::Ready { .. }, RedrawPolicy::Immediate) => {
                if self.draw_current()? {
                    Ok(Redraw::Drawn)
                } else {
                    Ok(Redraw::Scheduled)
                }
            }
            _ => Ok(Redraw::Scheduled),
        }
    }

    fn ensure_program(&mut self, formula: FormulaId) -> Result<(), RenderError> {
        if self.programs.contains_key(&formula) {
            return Ok(());
        }
        let kernel = self.kernels.get(formula);
        let linked = compile_and_link(kernel.vertex_source(), kernel.fragment_source())?;
        let handle = self.backend.create_program(formula, &linked)?;
        tracing::debug!(%formula, max_iterations = kernel.max_iterations(), "compiled formula program");
        self.programs.insert(
            formula,
            ShaderProgram {
                handle,
                interface: linked.into_interface(),
            },
        );
        Ok(())
    }

    fn ensure_geometry(&mut self) -> Result<(), GpuError> {
        if self.geometry.is_none() {
            self.geometry = Some(self.backend.upload_geometry(&FULL_SCREEN_QUAD)?);
        }
        Ok(())
    }

    fn draw_current(&mut self) -> Result<bool, RenderError> {
        let EngineState::Ready { formula } = self.state else {
            return Ok(false);
        };
        let viewport = self.backend.viewport();
        if viewport.is_empty() {
            tracing::trace!("skipping draw on empty viewport");
            return Ok(false);
        }
        self.ensure_geometry()?;
        let (Some(program), Some(geometry)) = (self.programs.get(&formula), self.geometry.as_ref())
        else {
            return Ok(false);
        };

        let parameters = self
            .kernels
            .get(formula)
            .prepare_parameters(&self.view, viewport);
        let block = UniformBlock::from_parameters(&program.interface, &parameters);
        tracing::debug!(
            %formula,
            center = ?parameters.center,
            scale = parameters.scale,
            width = viewport.width,
            height = viewport.height,
            "drawing frame"
        );

        // The frame is consumed whether or not the GPU accepted it.
        self.dirty = false;
        self.backend
            .draw(&program.handle, geometry, block.as_ref())?;
        self.frames += 1;
        Ok(true)
    }
}

fn numeric(field: ControlField, raw: &str) -> Result<f64, RenderError> {
    view::parse_numeric(raw).ok_or_else(|| RenderError::InvalidInput {
        field,
        raw: raw.to_string(),
    })
}
