use std::borrow::Cow;

use formulas::{FormulaId, QUAD_ATTRIBUTE};

use crate::program::{CompiledStage, LinkedProgram, ShaderError};
use crate::uniforms::FullScreenQuad;

/// Uniform buffer and bind group backing a program's parameter block.
pub(crate) struct UniformBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub size: u64,
}

/// Render pipeline built from a linked formula program.
pub struct FormulaPipeline {
    pub(crate) formula: FormulaId,
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniforms: Option<UniformBinding>,
    pub(crate) uses_quad: bool,
}

impl FormulaPipeline {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        formula: FormulaId,
        linked: &LinkedProgram,
    ) -> Result<Self, ShaderError> {
        let interface = linked.interface();
        let block = interface.primary_block();
        if let Some(block) = block {
            if block.group != 0 {
                return Err(ShaderError::Link {
                    log: format!(
                        "uniform block must use descriptor set 0, found set {}",
                        block.group
                    ),
                });
            }
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = shader_module(device, formula, linked.vertex());
        let fragment_module = shader_module(device, formula, linked.fragment());

        let uniform_layout = block.map(|block| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("formula uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: block.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = uniform_layout.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("formula pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let quad_location = interface.attribute_location(QUAD_ATTRIBUTE).index();
        let quad_attributes: Vec<wgpu::VertexAttribute> = quad_location
            .map(|location| wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: location,
            })
            .into_iter()
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = if quad_attributes.is_empty() {
            Vec::new()
        } else {
            vec![wgpu::VertexBufferLayout {
                array_stride: FullScreenQuad::STRIDE,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &quad_attributes,
            }]
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(formula.as_str()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let uniforms = match (block, uniform_layout.as_ref()) {
            (Some(block), Some(layout)) => {
                let size = (u64::from(block.size)).div_ceil(16).max(1) * 16;
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("formula uniforms"),
                    size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("formula uniform bind group"),
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: block.binding,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                Some(UniformBinding {
                    buffer,
                    bind_group,
                    size,
                })
            }
            _ => None,
        };

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link {
                log: error.to_string(),
            });
        }

        tracing::debug!(%formula, uses_quad = quad_location.is_some(), "built render pipeline");

        Ok(Self {
            formula,
            pipeline,
            uniforms,
            uses_quad: quad_location.is_some(),
        })
    }
}

fn shader_module(
    device: &wgpu::Device,
    formula: FormulaId,
    compiled: &CompiledStage,
) -> wgpu::ShaderModule {
    let label = format!("{formula} {}", compiled.stage());
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(compiled.source().to_string()),
            stage: compiled.stage().to_naga(),
            defines: &[],
        },
    })
}
