use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::kernel::{normalized_scale, resolution, FormulaKernel, GpuUniforms};
use crate::shader::{fragment_source, VERTEX_SHADER_GLSL};
use crate::view::{ViewState, Viewport};
use crate::FormulaId;

/// Colouring applied to the Julia escape count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JuliaPalette {
    /// Tri-phase cosine rainbow over 100 iterations.
    #[default]
    Rainbow,
    /// Intensity ramp over 300 iterations.
    Grayscale,
}

impl JuliaPalette {
    pub fn as_str(self) -> &'static str {
        match self {
            JuliaPalette::Rainbow => "rainbow",
            JuliaPalette::Grayscale => "grayscale",
        }
    }

    pub fn max_iterations(self) -> u32 {
        match self {
            JuliaPalette::Rainbow => 100,
            JuliaPalette::Grayscale => 300,
        }
    }

    fn glsl(self) -> &'static str {
        match self {
            JuliaPalette::Rainbow => RAINBOW,
            JuliaPalette::Grayscale => GRAYSCALE,
        }
    }
}

impl fmt::Display for JuliaPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JuliaPalette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rainbow" => Ok(JuliaPalette::Rainbow),
            "grayscale" | "greyscale" | "gray" | "grey" => Ok(JuliaPalette::Grayscale),
            other => Err(format!(
                "unknown julia palette '{other}' (expected rainbow or grayscale)"
            )),
        }
    }
}

const RAINBOW: &str = r"
vec3 palette(float t) {
    float r = 0.5 + 0.5 * cos(6.28318 * (t + 0.00));
    float g = 0.5 + 0.5 * cos(6.28318 * (t + 0.33));
    float b = 0.5 + 0.5 * cos(6.28318 * (t + 0.67));
    return vec3(r, g, b);
}
";

const GRAYSCALE: &str = r"
vec3 palette(float t) {
    return vec3(t);
}
";

/// `z = z^2 + c` with `c` pinned to the view center and `z0` at the pixel.
const ESCAPE_LOOP: &str = r"
void main() {
    vec2 frag = pixel_coord();
    vec2 c = params.center;
    vec2 z = (frag - params.resolution * 0.5) / params.scale;
    int n = 0;

    for (int i = 0; i < MAX_ITER; i++) {
        z = vec2(z.x * z.x - z.y * z.y, 2.0 * z.x * z.y) + c;
        if (length(z) >= 2.0) {
            break;
        }
        n++;
    }

    float t = float(n) / float(MAX_ITER);
    outColor = vec4(palette(t), 1.0);
}
";

pub struct JuliaKernel {
    palette: JuliaPalette,
    fragment: String,
}

impl Default for JuliaKernel {
    fn default() -> Self {
        Self::new(JuliaPalette::default())
    }
}

impl JuliaKernel {
    pub fn new(palette: JuliaPalette) -> Self {
        let body = format!("{}{ESCAPE_LOOP}", palette.glsl());
        Self {
            palette,
            fragment: fragment_source(palette.max_iterations(), &body),
        }
    }

    /// The 300-iteration intensity variant.
    pub fn grayscale() -> Self {
        Self::new(JuliaPalette::Grayscale)
    }

    pub fn palette(&self) -> JuliaPalette {
        self.palette
    }
}

impl FormulaKernel for JuliaKernel {
    fn id(&self) -> FormulaId {
        FormulaId::Julia
    }

    fn vertex_source(&self) -> &str {
        VERTEX_SHADER_GLSL
    }

    fn fragment_source(&self) -> &str {
        &self.fragment
    }

    fn max_iterations(&self) -> u32 {
        self.palette.max_iterations()
    }

    fn prepare_parameters(&self, view: &ViewState, viewport: Viewport) -> GpuUniforms {
        GpuUniforms {
            resolution: resolution(viewport),
            center: [view.center_x() as f32, view.center_y() as f32],
            scale: normalized_scale(view.scale(), viewport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;

    #[test]
    fn center_passes_through_unchanged() {
        let view = ViewState::new(-0.7, 0.27015, 1.0, FormulaId::Julia);
        let uniforms = JuliaKernel::default().prepare_parameters(&view, Viewport::new(720, 720));
        assert_eq!(uniforms.center, [-0.7_f32, 0.27015_f32]);
        assert_eq!(uniforms.scale, 400.0);
        assert_eq!(uniforms.resolution, [720.0, 720.0]);
    }

    #[test]
    fn fragment_declares_iteration_cap() {
        let kernel = JuliaKernel::default();
        assert!(kernel.fragment_source().starts_with("#version 450"));
        assert!(kernel.fragment_source().contains("const int MAX_ITER = 100;"));
    }

    #[test]
    fn fragment_runs_quadratic_escape_loop() {
        let source = JuliaKernel::default().fragment_source().to_string();
        assert!(source.contains("vec2 c = params.center;"));
        assert!(source.contains("z = vec2(z.x * z.x - z.y * z.y, 2.0 * z.x * z.y) + c;"));
        assert!(source.contains("if (length(z) >= 2.0) {"));
        assert!(source.contains("float t = float(n) / float(MAX_ITER);"));
    }

    #[test]
    fn rainbow_palette_uses_third_turn_phases() {
        let source = JuliaKernel::default().fragment_source().to_string();
        assert!(source.contains("cos(6.28318 * (t + 0.00))"));
        assert!(source.contains("cos(6.28318 * (t + 0.33))"));
        assert!(source.contains("cos(6.28318 * (t + 0.67))"));

        for t in [0.0, 0.1, 0.25, 0.5, 0.9] {
            let [r, g, b] = reference::julia_rainbow(t);
            assert_eq!(g, reference::julia_rainbow(t + 0.33)[0]);
            assert_eq!(b, reference::julia_rainbow(t + 0.67)[0]);
            assert!((0.0..=1.0).contains(&r));
        }
        assert_eq!(reference::julia_rainbow(0.0)[0], 1.0);
    }

    #[test]
    fn escape_counts_match_known_points() {
        let cap = JuliaKernel::default().max_iterations();
        // Origin with c = 0 is a fixed point.
        assert_eq!(reference::julia_escape([0.0, 0.0], [0.0, 0.0], cap), cap);
        // The unit circle is invariant under z^2.
        assert_eq!(reference::julia_escape([1.0, 0.0], [0.0, 0.0], cap), cap);
        assert_eq!(reference::julia_escape([2.0, 0.0], [0.0, 0.0], cap), 0);
        // 0 -> 1 -> 2 escapes on the second step.
        assert_eq!(reference::julia_escape([0.0, 0.0], [1.0, 0.0], cap), 1);
    }

    #[test]
    fn grayscale_variant_runs_three_hundred_iterations() {
        let kernel = JuliaKernel::grayscale();
        assert_eq!(kernel.palette(), JuliaPalette::Grayscale);
        assert_eq!(kernel.max_iterations(), 300);
        let source = kernel.fragment_source();
        assert!(source.contains("const int MAX_ITER = 300;"));
        assert!(source.contains("return vec3(t);"));
        assert!(!source.contains("6.28318"));
        assert_eq!(reference::julia_grayscale(0.4), [0.4, 0.4, 0.4]);
    }

    #[test]
    fn palette_names_round_trip() {
        for palette in [JuliaPalette::Rainbow, JuliaPalette::Grayscale] {
            assert_eq!(palette.as_str().parse::<JuliaPalette>(), Ok(palette));
        }
        assert_eq!("Greyscale".parse::<JuliaPalette>(), Ok(JuliaPalette::Grayscale));
        assert!("sepia".parse::<JuliaPalette>().is_err());
    }
}
