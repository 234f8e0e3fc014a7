use crate::kernel::{normalized_scale, resolution, FormulaKernel, GpuUniforms};
use crate::shader::{fragment_source, VERTEX_SHADER_GLSL};
use crate::view::{ViewState, Viewport};
use crate::FormulaId;

const MAX_ITERATIONS: u32 = 100;

/// The logistic parameter plane spans a wider range than the complex maps,
/// so user scale is quartered before normalization.
const SCALE_DIVISOR: f64 = 4.0;

/// Logistic map `x = r x (1 - x)` with `r` alternating between the pixel's
/// two coordinates in runs of six, accumulating `log2|r (1 - 2x)|`. The view
/// center seeds `x` and the running exponent.
const BODY: &str = r"
const int RUN_LENGTH = 6;
const float EPSILON = 0.0001;

vec3 exponent_color(float h) {
    h /= float(MAX_ITER) * 12.0;
    vec3 col = vec3(0.0);
    if (h > 0.0) {
        col = vec3(0.5) + vec3(0.5) * sin(vec3(0.0, 0.4, 0.7) + vec3(2.5 * h));
        col = col * pow(h, 0.25);
    }
    return clamp(col, vec3(0.0), vec3(1.0));
}

void main() {
    vec2 frag = pixel_coord();
    vec2 p = (frag - params.resolution * 0.5) / params.scale;
    float x = params.center.x;
    float h = params.center.y;

    for (int i = 0; i < MAX_ITER; i++) {
        for (int j = 0; j < RUN_LENGTH; j++) {
            x = p.x * x * (1.0 - x);
            h += log2(abs(p.x * (1.0 - 2.0 * x)) + EPSILON);
        }
        for (int j = 0; j < RUN_LENGTH; j++) {
            x = p.y * x * (1.0 - x);
            h += log2(abs(p.y * (1.0 - 2.0 * x)) + EPSILON);
        }
    }

    outColor = vec4(exponent_color(h), 1.0);
}
";

pub struct LyapunovKernel {
    fragment: String,
}

impl Default for LyapunovKernel {
    fn default() -> Self {
        Self {
            fragment: fragment_source(MAX_ITERATIONS, BODY),
        }
    }
}

impl FormulaKernel for LyapunovKernel {
    fn id(&self) -> FormulaId {
        FormulaId::Lyapunov
    }

    fn vertex_source(&self) -> &str {
        VERTEX_SHADER_GLSL
    }

    fn fragment_source(&self) -> &str {
        &self.fragment
    }

    fn max_iterations(&self) -> u32 {
        MAX_ITERATIONS
    }

    fn prepare_parameters(&self, view: &ViewState, viewport: Viewport) -> GpuUniforms {
        GpuUniforms {
            resolution: resolution(viewport),
            center: [view.center_x() as f32, view.center_y() as f32],
            scale: normalized_scale(view.scale() / SCALE_DIVISOR, viewport),
        }
    }
}
