use anyhow::Result;
use formulas::{FormulaId, Viewport};
use winit::dpi::PhysicalSize;

use crate::engine::{GpuBackend, GpuError, GpuErrorKind};
use crate::program::{LinkedProgram, ShaderError};
use crate::types::GpuPowerPreference;
use crate::uniforms::{FullScreenQuad, UniformBlock};

use super::context::GpuContext;
use super::pipeline::FormulaPipeline;

/// Vertex buffer holding the full-screen quad.
pub struct QuadBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// wgpu implementation of [`GpuBackend`] drawing into a window surface.
pub struct WgpuBackend {
    context: GpuContext,
}

impl WgpuBackend {
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: PhysicalSize<u32>,
        power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self> {
        let context = GpuContext::new(target, size, power, vsync)?;
        Ok(Self { context })
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    pub fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    fn acquire_frame(&mut self) -> Result<wgpu::SurfaceTexture, GpuError> {
        self.context
            .surface
            .get_current_texture()
            .map_err(|err| match err {
                wgpu::SurfaceError::Lost => GpuError::new(GpuErrorKind::SurfaceLost, err.to_string()),
                wgpu::SurfaceError::Outdated => {
                    GpuError::new(GpuErrorKind::SurfaceOutdated, err.to_string())
                }
                wgpu::SurfaceError::Timeout => {
                    GpuError::new(GpuErrorKind::SurfaceTimeout, err.to_string())
                }
                wgpu::SurfaceError::OutOfMemory => {
                    GpuError::new(GpuErrorKind::OutOfMemory, err.to_string())
                }
                _ => GpuError::new(GpuErrorKind::Internal, err.to_string()),
            })
    }

    /// Pops the scopes pushed by [`push_scopes`] and reports the first error.
    fn pop_scopes(&self) -> Result<(), GpuError> {
        let validation = pollster::block_on(self.context.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.context.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(error) => Err(classify(error)),
            None => Ok(()),
        }
    }

    fn push_scopes(&self) {
        self.context
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.context
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
    }
}

impl GpuBackend for WgpuBackend {
    type Program = FormulaPipeline;
    type Geometry = QuadBuffer;

    fn viewport(&self) -> Viewport {
        self.context.size.viewport()
    }

    fn create_program(
        &mut self,
        formula: FormulaId,
        linked: &LinkedProgram,
    ) -> Result<Self::Program, ShaderError> {
        FormulaPipeline::new(
            &self.context.device,
            self.context.surface_format,
            formula,
            linked,
        )
    }

    fn upload_geometry(&mut self, quad: &FullScreenQuad) -> Result<Self::Geometry, GpuError> {
        use wgpu::util::DeviceExt;

        self.push_scopes();
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("full-screen quad"),
                contents: quad.as_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.pop_scopes()?;
        tracing::debug!(bytes = quad.as_bytes().len(), "uploaded full-screen quad");
        Ok(QuadBuffer {
            buffer,
            vertex_count: quad.vertex_count(),
        })
    }

    fn draw(
        &mut self,
        program: &Self::Program,
        geometry: &Self::Geometry,
        uniforms: Option<&UniformBlock>,
    ) -> Result<(), GpuError> {
        let frame = self.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.push_scopes();
        if let (Some(binding), Some(block)) = (program.uniforms.as_ref(), uniforms) {
            let bytes = block.as_bytes();
            let len = bytes.len().min(binding.size as usize);
            self.context
                .queue
                .write_buffer(&binding.buffer, 0, &bytes[..len]);
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("formula encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(program.formula.as_str()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            if let Some(binding) = program.uniforms.as_ref() {
                render_pass.set_bind_group(0, &binding.bind_group, &[]);
            }
            if program.uses_quad {
                render_pass.set_vertex_buffer(0, geometry.buffer.slice(..));
            }
            render_pass.draw(0..geometry.vertex_count, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
        let scoped = self.pop_scopes();
        frame.present();
        scoped
    }
}

fn classify(error: wgpu::Error) -> GpuError {
    let kind = match &error {
        wgpu::Error::OutOfMemory { .. } => GpuErrorKind::OutOfMemory,
        wgpu::Error::Validation { .. } => GpuErrorKind::Validation,
        _ => GpuErrorKind::Internal,
    };
    GpuError::new(kind, error.to_string())
}
