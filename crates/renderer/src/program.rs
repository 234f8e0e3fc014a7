//! Shader program manager.
//!
//! Kernels hand us a vertex/fragment GLSL pair. Each stage is parsed and
//! validated on its own through naga; the first stage that fails ends the
//! attempt with a [`ShaderError::Compile`] carrying the rendered diagnostic.
//! Once both stages compile they are "linked": entry points are checked and
//! the varyings the fragment stage reads must be written by the vertex stage
//! with the same type. The surviving pair is reflected into a
//! [`ProgramInterface`] so uniforms and attributes can be addressed by name.
//!
//! Name lookups never fail loudly. An unknown name yields a `NOT_FOUND`
//! location, and writes through it are ignored by [`crate::UniformBlock`].

use std::collections::HashMap;
use std::fmt;

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link shader program:\n{log}")]
    Link { log: String },
}

/// Shape of a reflected uniform member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    Other,
}

impl UniformKind {
    fn of(inner: &naga::TypeInner) -> Self {
        match inner {
            naga::TypeInner::Scalar(scalar) => match (scalar.kind, scalar.width) {
                (naga::ScalarKind::Float, 4) => UniformKind::Float,
                (naga::ScalarKind::Sint, 4) => UniformKind::Int,
                _ => UniformKind::Other,
            },
            naga::TypeInner::Vector { size, scalar }
                if scalar.kind == naga::ScalarKind::Float && scalar.width == 4 =>
            {
                match size {
                    naga::VectorSize::Bi => UniformKind::Vec2,
                    naga::VectorSize::Tri => UniformKind::Vec3,
                    naga::VectorSize::Quad => UniformKind::Vec4,
                }
            }
            _ => UniformKind::Other,
        }
    }
}

/// Where a named uniform lives inside its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation(Option<UniformSlot>);

impl UniformLocation {
    pub const NOT_FOUND: Self = Self(None);

    pub fn is_found(&self) -> bool {
        self.0.is_some()
    }

    pub fn slot(&self) -> Option<&UniformSlot> {
        self.0.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLocation(Option<u32>);

impl AttributeLocation {
    pub const NOT_FOUND: Self = Self(None);

    pub fn is_found(&self) -> bool {
        self.0.is_some()
    }

    pub fn index(&self) -> Option<u32> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBlockLayout {
    pub group: u32,
    pub binding: u32,
    pub size: u32,
}

/// Name-addressable view of a linked program's inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramInterface {
    uniforms: HashMap<String, UniformSlot>,
    attributes: HashMap<String, u32>,
    blocks: Vec<UniformBlockLayout>,
}

impl ProgramInterface {
    pub fn uniform_location(&self, name: &str) -> UniformLocation {
        UniformLocation(self.uniforms.get(name).copied())
    }

    pub fn attribute_location(&self, name: &str) -> AttributeLocation {
        AttributeLocation(self.attributes.get(name).copied())
    }

    /// The block kernels write their parameters into.
    pub fn primary_block(&self) -> Option<UniformBlockLayout> {
        self.blocks.first().copied()
    }

    fn absorb_uniforms(&mut self, module: &naga::Module) {
        for (_, var) in module.global_variables.iter() {
            if var.space != naga::AddressSpace::Uniform {
                continue;
            }
            let Some(binding) = var.binding.as_ref() else {
                continue;
            };
            let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
                continue;
            };
            if !self
                .blocks
                .iter()
                .any(|block| block.group == binding.group && block.binding == binding.binding)
            {
                self.blocks.push(UniformBlockLayout {
                    group: binding.group,
                    binding: binding.binding,
                    size: *span,
                });
            }
            for member in members {
                let Some(name) = member.name.as_ref() else {
                    continue;
                };
                self.uniforms.entry(name.clone()).or_insert(UniformSlot {
                    group: binding.group,
                    binding: binding.binding,
                    offset: member.offset,
                    kind: UniformKind::of(&module.types[member.ty].inner),
                });
            }
        }
    }
}

/// One stage that parsed and validated cleanly.
#[derive(Debug)]
pub struct CompiledStage {
    stage: ShaderStage,
    source: String,
    module: naga::Module,
}

impl CompiledStage {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn entry_point(&self) -> Option<&naga::EntryPoint> {
        let stage = self.stage.to_naga();
        self.module
            .entry_points
            .iter()
            .find(|entry| entry.stage == stage)
    }
}

/// A vertex/fragment pair that passed the interface check.
#[derive(Debug)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    interface: ProgramInterface,
}

impl LinkedProgram {
    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    pub fn into_interface(self) -> ProgramInterface {
        self.interface
    }
}

/// Parses and validates a single GLSL stage.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(stage.to_naga());
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| ShaderError::Compile {
            stage,
            log: non_empty_log(errors.emit_to_string(source), || errors.to_string()),
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|error| ShaderError::Compile {
            stage,
            log: non_empty_log(error.emit_to_string(source), || error.to_string()),
        })?;

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        module,
    })
}

/// Compiles both stages (vertex first) and links them.
pub fn compile_and_link(
    vertex_source: &str,
    fragment_source: &str,
) -> Result<LinkedProgram, ShaderError> {
    let vertex = compile_stage(ShaderStage::Vertex, vertex_source)?;
    let fragment = compile_stage(ShaderStage::Fragment, fragment_source)?;
    link(vertex, fragment)
}

fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    let mut problems = Vec::new();

    let vertex_entry = vertex.entry_point();
    let fragment_entry = fragment.entry_point();
    if vertex_entry.is_none() {
        problems.push("vertex stage has no vertex entry point".to_string());
    }
    if fragment_entry.is_none() {
        problems.push("fragment stage has no fragment entry point".to_string());
    }

    if let (Some(vertex_entry), Some(fragment_entry)) = (vertex_entry, fragment_entry) {
        let outputs = stage_outputs(&vertex.module, vertex_entry);
        for (name, location, inner) in stage_inputs(&fragment.module, fragment_entry) {
            match outputs.get(&location) {
                Some(output) if *output == inner => {}
                Some(output) => problems.push(format!(
                    "fragment input `{name}` at location {location} is {inner:?} but the vertex stage writes {output:?}"
                )),
                None => problems.push(format!(
                    "fragment input `{name}` at location {location} is not written by the vertex stage"
                )),
            }
        }
    }

    let mut interface = ProgramInterface::default();
    interface.absorb_uniforms(&vertex.module);
    let vertex_blocks = interface.blocks.clone();
    let mut fragment_interface = ProgramInterface::default();
    fragment_interface.absorb_uniforms(&fragment.module);
    for block in &fragment_interface.blocks {
        if let Some(existing) = vertex_blocks
            .iter()
            .find(|other| other.group == block.group && other.binding == block.binding)
        {
            if existing.size != block.size {
                problems.push(format!(
                    "uniform block at set {} binding {} is {} bytes in the vertex stage but {} bytes in the fragment stage",
                    block.group, block.binding, existing.size, block.size
                ));
            }
        }
    }
    interface.absorb_uniforms(&fragment.module);

    if !problems.is_empty() {
        return Err(ShaderError::Link {
            log: problems.join("\n"),
        });
    }

    if let Some(entry) = vertex_entry {
        for (name, location, _) in stage_inputs(&vertex.module, entry) {
            interface.attributes.insert(name, location);
        }
    }

    tracing::debug!(
        uniforms = interface.uniforms.len(),
        attributes = interface.attributes.len(),
        blocks = interface.blocks.len(),
        "linked shader program"
    );

    Ok(LinkedProgram {
        vertex,
        fragment,
        interface,
    })
}

fn stage_inputs(
    module: &naga::Module,
    entry: &naga::EntryPoint,
) -> Vec<(String, u32, naga::TypeInner)> {
    entry
        .function
        .arguments
        .iter()
        .filter_map(|argument| match argument.binding.as_ref() {
            Some(naga::Binding::Location { location, .. }) => Some((
                argument
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("location{location}")),
                *location,
                module.types[argument.ty].inner.clone(),
            )),
            _ => None,
        })
        .collect()
}

fn stage_outputs(module: &naga::Module, entry: &naga::EntryPoint) -> HashMap<u32, naga::TypeInner> {
    let mut outputs = HashMap::new();
    let Some(result) = entry.function.result.as_ref() else {
        return outputs;
    };
    match result.binding.as_ref() {
        Some(naga::Binding::Location { location, .. }) => {
            outputs.insert(*location, module.types[result.ty].inner.clone());
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[result.ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = member.binding.as_ref() {
                        outputs.insert(*location, module.types[member.ty].inner.clone());
                    }
                }
            }
        }
    }
    outputs
}

fn non_empty_log(log: String, fallback: impl FnOnce() -> String) -> String {
    if log.trim().is_empty() {
        fallback()
    } else {
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulas::{
        FormulaKernel, KernelSet, QUAD_ATTRIBUTE, UNIFORM_CENTER, UNIFORM_RESOLUTION, UNIFORM_SCALE,
    };

    const VARYING_VERTEX: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

    const VEC2_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(v_uv, 0.0, 1.0);
}
";

    const VEC4_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec4 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = v_uv;
}
";

    #[test]
    fn builtin_kernels_compile_and_link() {
        let kernels = KernelSet::builtin();
        for kernel in kernels.iter() {
            let program = compile_and_link(kernel.vertex_source(), kernel.fragment_source())
                .unwrap_or_else(|err| panic!("{} failed: {err}", kernel.id()));
            assert!(program.interface().primary_block().is_some());
            assert_eq!(program.vertex().stage(), ShaderStage::Vertex);
            assert_eq!(program.fragment().stage(), ShaderStage::Fragment);
        }
    }

    #[test]
    fn grayscale_julia_compiles_and_links() {
        let kernel = formulas::JuliaKernel::grayscale();
        let program = compile_and_link(kernel.vertex_source(), kernel.fragment_source())
            .unwrap_or_else(|err| panic!("grayscale julia failed: {err}"));
        assert!(program
            .interface()
            .uniform_location(UNIFORM_CENTER)
            .is_found());
    }

    #[test]
    fn reflects_uniform_block_layout() {
        let kernels = KernelSet::builtin();
        let kernel = kernels.get(formulas::FormulaId::Julia);
        let program = compile_and_link(kernel.vertex_source(), kernel.fragment_source()).unwrap();
        let interface = program.interface();

        let resolution = interface.uniform_location(UNIFORM_RESOLUTION);
        let center = interface.uniform_location(UNIFORM_CENTER);
        let scale = interface.uniform_location(UNIFORM_SCALE);

        assert_eq!(resolution.slot().map(|s| (s.offset, s.kind)), Some((0, UniformKind::Vec2)));
        assert_eq!(center.slot().map(|s| (s.offset, s.kind)), Some((8, UniformKind::Vec2)));
        assert_eq!(scale.slot().map(|s| (s.offset, s.kind)), Some((16, UniformKind::Float)));

        let block = interface.primary_block().unwrap();
        assert_eq!((block.group, block.binding), (0, 0));
        assert!(block.size >= 20);
    }

    #[test]
    fn unknown_names_return_not_found() {
        let kernels = KernelSet::builtin();
        let kernel = kernels.get(formulas::FormulaId::Lyapunov);
        let program = compile_and_link(kernel.vertex_source(), kernel.fragment_source()).unwrap();

        assert_eq!(
            program.interface().uniform_location("u_zoom"),
            UniformLocation::NOT_FOUND
        );
        assert_eq!(
            program.interface().attribute_location("aVertexPosition"),
            AttributeLocation::NOT_FOUND
        );
        assert_eq!(
            program.interface().attribute_location(QUAD_ATTRIBUTE).index(),
            Some(0)
        );
    }

    #[test]
    fn malformed_fragment_reports_compile_error() {
        let err = compile_and_link(
            formulas::VERTEX_SHADER_GLSL,
            "#version 450\nvoid main() { this is not glsl }\n",
        )
        .unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.trim().is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn vertex_failure_stops_before_fragment() {
        let err = compile_and_link("#version 450\nvoid main( {\n", "also broken").unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_varyings_fail_to_link() {
        let err = compile_and_link(VARYING_VERTEX, VEC4_FRAGMENT).unwrap_err();
        match err {
            ShaderError::Link { log } => assert!(log.contains("location 0")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn unwritten_varying_fails_to_link() {
        let err = compile_and_link(formulas::VERTEX_SHADER_GLSL, VEC2_FRAGMENT).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn matching_varyings_link() {
        let program = compile_and_link(VARYING_VERTEX, VEC2_FRAGMENT).unwrap();
        assert!(program.interface().primary_block().is_none());
        assert_eq!(
            program.interface().uniform_location(UNIFORM_SCALE),
            UniformLocation::NOT_FOUND
        );
    }
}
