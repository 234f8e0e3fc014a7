use formulas::{JuliaPalette, KernelSet, ViewState};

use crate::engine::RedrawPolicy;

/// Adapter power class requested from wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl std::fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

/// Options accepted by [`crate::Renderer::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Title prefix; the view summary is appended after it.
    pub title: String,
    /// View shown on the first frame.
    pub initial_view: ViewState,
    pub julia_palette: JuliaPalette,
    pub power: GpuPowerPreference,
    pub vsync: bool,
    pub redraw: RedrawPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "fractoscope".to_string(),
            initial_view: ViewState::default(),
            julia_palette: JuliaPalette::default(),
            power: GpuPowerPreference::default(),
            vsync: true,
            redraw: RedrawPolicy::Coalesced,
        }
    }
}

impl RendererConfig {
    /// Window title for the given view.
    pub fn title_for(&self, view: &ViewState) -> String {
        format!("{} | {}", self.title, view.summary())
    }

    /// Kernel table the engine should start with.
    pub fn kernels(&self) -> KernelSet {
        KernelSet::builtin().with_julia_palette(self.julia_palette)
    }
}
