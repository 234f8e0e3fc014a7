//! Formula kernels and view math for the fractoscope renderer.
//!
//! Everything in this crate is GPU-free so the numeric contracts can be
//! exercised without a device:
//!
//! - `FormulaId` is the closed set of supported mappings and parses the names
//!   a formula selector hands us.
//! - `view` holds `ViewState`/`Viewport` and the coordinate mapping that turns
//!   pointer, wheel and numeric input into view updates.
//! - `kernel` defines the `FormulaKernel` capability plus the `KernelSet`
//!   table the renderer dispatches through.
//! - `julia`, `burning_ship` and `lyapunov` carry the GLSL for each mapping
//!   and their formula-specific uniform remaps. Julia comes in two palettes;
//!   the grayscale one runs 300 iterations.

mod burning_ship;
mod julia;
mod kernel;
mod lyapunov;
#[cfg(test)]
mod reference;
mod shader;
pub mod view;

pub use burning_ship::BurningShipKernel;
pub use julia::{JuliaKernel, JuliaPalette};
pub use kernel::{normalized_scale, FormulaKernel, GpuUniforms, KernelSet};
pub use lyapunov::LyapunovKernel;
pub use shader::{
    QUAD_ATTRIBUTE, UNIFORM_CENTER, UNIFORM_RESOLUTION, UNIFORM_SCALE, VERTEX_SHADER_GLSL,
};
pub use view::{ViewState, Viewport, WheelDirection, SCALE_MAX, SCALE_MIN};

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Selects which formula kernel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormulaId {
    Julia,
    BurningShip,
    Lyapunov,
}

impl FormulaId {
    pub const ALL: [FormulaId; 3] = [
        FormulaId::Julia,
        FormulaId::BurningShip,
        FormulaId::Lyapunov,
    ];

    /// Canonical selector name, also used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            FormulaId::Julia => "julia",
            FormulaId::BurningShip => "burning-ship",
            FormulaId::Lyapunov => "lyapunov",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FormulaId::Julia => "Julia",
            FormulaId::BurningShip => "Burning Ship",
            FormulaId::Lyapunov => "Lyapunov",
        }
    }
}

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a selector names a formula we do not ship.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown formula '{id}' (expected julia, burning-ship, or lyapunov)")]
pub struct UnknownFormulaError {
    pub id: String,
}

impl FromStr for FormulaId {
    type Err = UnknownFormulaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "julia" => Ok(FormulaId::Julia),
            "burningship" | "ship" => Ok(FormulaId::BurningShip),
            "lyapunov" => Ok(FormulaId::Lyapunov),
            _ => Err(UnknownFormulaError {
                id: value.to_string(),
            }),
        }
    }
}

impl Serialize for FormulaId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormulaId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = FormulaId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a formula name (julia, burning-ship, lyapunov)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}
