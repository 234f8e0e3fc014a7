use crate::kernel::{normalized_scale, resolution, FormulaKernel, GpuUniforms};
use crate::shader::{fragment_source, VERTEX_SHADER_GLSL};
use crate::view::{ViewState, Viewport};
use crate::FormulaId;

const MAX_ITERATIONS: u32 = 100;

/// Offsets that put the ship's hull in frame at the default view.
const CENTER_OFFSET: [f64; 2] = [0.95, 0.75];
const CENTER_GAIN: f64 = 2.0;

/// Quadratic map with the cross term folded through `abs` before doubling.
/// `c` walks with the pixel (shifted by the remapped center) and `z0` starts
/// at the pixel's offset from the middle of the surface.
const BODY: &str = r"
vec3 palette(float t) {
    float r = 0.9 + 0.1 * cos(t * 3.14159);
    float g = 0.5 * sin(t * 3.14159 * 2.0);
    float b = 0.1 * sin(t * 3.14159);
    return vec3(r, g, b);
}

void main() {
    vec2 frag = pixel_coord();
    vec2 c = vec2(frag.x / params.scale - params.center.x, frag.y / params.scale - params.center.y);
    vec2 z = (frag - params.resolution * 0.5) / params.scale;
    int n = 0;

    for (int i = 0; i < MAX_ITER; i++) {
        z = vec2(z.x * z.x - z.y * z.y + c.x, 2.0 * abs(z.x * z.y) + c.y);
        if (length(z) >= 2.0) {
            break;
        }
        n++;
    }

    float t = float(n) / float(MAX_ITER);
    outColor = vec4(clamp(palette(t), vec3(0.0), vec3(1.0)), 1.0);
}
";

pub struct BurningShipKernel {
    fragment: String,
}

impl Default for BurningShipKernel {
    fn default() -> Self {
        Self {
            fragment: fragment_source(MAX_ITERATIONS, BODY),
        }
    }
}

impl FormulaKernel for BurningShipKernel {
    fn id(&self) -> FormulaId {
        FormulaId::BurningShip
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
        let center_x = (view.center_x() + CENTER_OFFSET[0]) * CENTER_GAIN;
        let center_y = (view.center_y() + CENTER_OFFSET[1]) * CENTER_GAIN;
        GpuUniforms {
            resolution: resolution(viewport),
            center: [center_x as f32, center_y as f32],
            scale: normalized_scale(view.scale(), viewport),
        }
    }
}
