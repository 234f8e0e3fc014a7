//! wgpu side of the renderer.
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain on resize or loss. A minimised window reports an empty
//!   viewport while the swapchain keeps its last size.
//! - `pipeline` turns a linked formula program into a render pipeline with
//!   one uniform bind group and the quad's vertex layout.
//! - `binder` implements `GpuBackend`: it uploads the quad once, writes the
//!   parameter block each frame and draws the strip inside error scopes.

mod binder;
pub(crate) mod context;
mod pipeline;

pub use binder::{QuadBuffer, WgpuBackend};
pub use pipeline::FormulaPipeline;
