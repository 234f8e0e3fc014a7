use std::sync::Arc;

use crate::view::{ViewState, Viewport};
use crate::{BurningShipKernel, FormulaId, JuliaKernel, JuliaPalette, LyapunovKernel};

/// Reference edge length the zoom factor was tuned against.
const REFERENCE_EXTENT: f64 = 720.0;
/// Pixels per parameter-space unit at `scale == 1` on the reference extent.
const PIXELS_PER_UNIT: f64 = 400.0;

/// Shader-visible values for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuUniforms {
    pub resolution: [f32; 2],
    pub center: [f32; 2],
    pub scale: f32,
}

/// Behaviour every formula supplies: shader text plus its uniform remap.
pub trait FormulaKernel: Send + Sync {
    fn id(&self) -> FormulaId;
    fn vertex_source(&self) -> &str;
    fn fragment_source(&self) -> &str;
    fn max_iterations(&self) -> u32;
    fn prepare_parameters(&self, view: &ViewState, viewport: Viewport) -> GpuUniforms;
}

/// Converts a user scale to pixels per unit so apparent zoom matches across
/// window sizes: `scale * 400 * min(width, height) / 720`.
pub fn normalized_scale(scale: f64, viewport: Viewport) -> f32 {
    (scale * PIXELS_PER_UNIT * f64::from(viewport.min_dimension()) / REFERENCE_EXTENT) as f32
}

pub(crate) fn resolution(viewport: Viewport) -> [f32; 2] {
    [viewport.width as f32, viewport.height as f32]
}

/// Kernel lookup table indexed by `FormulaId`.
#[derive(Clone)]
pub struct KernelSet {
    julia: Arc<dyn FormulaKernel>,
    burning_ship: Arc<dyn FormulaKernel>,
    lyapunov: Arc<dyn FormulaKernel>,
}

impl Default for KernelSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KernelSet {
    pub fn builtin() -> Self {
        Self {
            julia: Arc::new(JuliaKernel::default()),
            burning_ship: Arc::new(BurningShipKernel::default()),
            lyapunov: Arc::new(LyapunovKernel::default()),
        }
    }

    pub fn get(&self, id: FormulaId) -> &dyn FormulaKernel {
        match id {
            FormulaId::Julia => self.julia.as_ref(),
            FormulaId::BurningShip => self.burning_ship.as_ref(),
            FormulaId::Lyapunov => self.lyapunov.as_ref(),
        }
    }

    /// Replaces the kernel registered for `kernel.id()`.
    pub fn with_kernel(mut self, kernel: Arc<dyn FormulaKernel>) -> Self {
        let slot = match kernel.id() {
            FormulaId::Julia => &mut self.julia,
            FormulaId::BurningShip => &mut self.burning_ship,
            FormulaId::Lyapunov => &mut self.lyapunov,
        };
        tracing::debug!(formula = %kernel.id(), "overriding built-in kernel");
        *slot = kernel;
        self
    }

    /// Swaps the Julia slot for one using `palette`.
    pub fn with_julia_palette(self, palette: JuliaPalette) -> Self {
        if palette == JuliaPalette::default() {
            return self;
        }
        self.with_kernel(Arc::new(JuliaKernel::new(palette)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn FormulaKernel> + '_ {
        FormulaId::ALL.into_iter().map(move |id| self.get(id))
    }
}
