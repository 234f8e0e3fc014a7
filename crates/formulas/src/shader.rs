/// Vertex attribute carrying the full-screen quad corners.
pub const QUAD_ATTRIBUTE: &str = "a_position";

pub const UNIFORM_RESOLUTION: &str = "resolution";
pub const UNIFORM_CENTER: &str = "center";
pub const UNIFORM_SCALE: &str = "scale";

/// Pass-through vertex stage shared by every kernel. The quad is already in
/// normalized device coordinates.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Uniform block and output declarations every fragment kernel starts with.
///
/// The block layout is reflected at link time, so member order here only has
/// to agree with itself. `pixel_coord()` flips the surface's top-left origin
/// to a bottom-left one so parameter space grows upwards.
const FRAGMENT_PRELUDE: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform Params {
    vec2 resolution;
    vec2 center;
    float scale;
} params;

vec2 pixel_coord() {
    return vec2(gl_FragCoord.x, params.resolution.y - gl_FragCoord.y);
}
";

/// Prepends the shared prelude and pins the iteration cap as a constant.
pub(crate) fn fragment_source(max_iterations: u32, body: &str) -> String {
    format!("{FRAGMENT_PRELUDE}\nconst int MAX_ITER = {max_iterations};\n{body}")
}
