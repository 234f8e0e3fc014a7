use bytemuck::{Pod, Zeroable};
use formulas::{GpuUniforms, UNIFORM_CENTER, UNIFORM_RESOLUTION, UNIFORM_SCALE};

use crate::program::{ProgramInterface, UniformBlockLayout, UniformKind, UniformLocation};

/// Clip-space corner of the full-screen quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

/// Two triangles covering clip space, drawn as a four-vertex strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullScreenQuad {
    pub vertices: [QuadVertex; 4],
}

pub const FULL_SCREEN_QUAD: FullScreenQuad = FullScreenQuad {
    vertices: [
        QuadVertex {
            position: [-1.0, -1.0],
        },
        QuadVertex {
            position: [1.0, -1.0],
        },
        QuadVertex {
            position: [-1.0, 1.0],
        },
        QuadVertex {
            position: [1.0, 1.0],
        },
    ],
};

impl FullScreenQuad {
    pub const STRIDE: u64 = std::mem::size_of::<QuadVertex>() as u64;

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// CPU copy of one std140 uniform block, written member by member through
/// reflected locations.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    group: u32,
    binding: u32,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformBlockLayout) -> Self {
        let padded = (layout.size as usize).div_ceil(16).max(1) * 16;
        Self {
            group: layout.group,
            binding: layout.binding,
            bytes: vec![0; padded],
        }
    }

    /// Writes the kernel parameters into the program's primary block.
    ///
    /// Programs without a uniform block get `None`; members the program does
    /// not declare are skipped.
    pub fn from_parameters(interface: &ProgramInterface, uniforms: &GpuUniforms) -> Option<Self> {
        let mut block = Self::new(interface.primary_block()?);
        block.write_vec2(
            interface.uniform_location(UNIFORM_RESOLUTION),
            uniforms.resolution,
        );
        block.write_vec2(interface.uniform_location(UNIFORM_CENTER), uniforms.center);
        block.write_f32(interface.uniform_location(UNIFORM_SCALE), uniforms.scale);
        Some(block)
    }

    pub fn write_f32(&mut self, location: UniformLocation, value: f32) -> bool {
        self.write(location, UniformKind::Float, &[value])
    }

    pub fn write_vec2(&mut self, location: UniformLocation, value: [f32; 2]) -> bool {
        self.write(location, UniformKind::Vec2, &value)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, location: UniformLocation, kind: UniformKind, values: &[f32]) -> bool {
        let Some(slot) = location.slot() else {
            return false;
        };
        if slot.group != self.group || slot.binding != self.binding {
            return false;
        }
        if slot.kind != kind {
            tracing::trace!(
                expected = ?slot.kind,
                actual = ?kind,
                offset = slot.offset,
                "skipping uniform write with mismatched type"
            );
            return false;
        }
        let data: &[u8] = bytemuck::cast_slice(values);
        let start = slot.offset as usize;
        match self.bytes.get_mut(start..start + data.len()) {
            Some(target) => {
                target.copy_from_slice(data);
                true
            }
            None => false,
        }
    }
}
