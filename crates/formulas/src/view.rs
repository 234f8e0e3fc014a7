//! View parameters shared by every formula and the input mapping that edits
//! them.
//!
//! The mapping is deliberately absolute: a pointer move sets the center to the
//! pointer's normalized position instead of panning by a delta. Wheel ticks
//! zoom multiplicatively and numeric controls overwrite fields verbatim. All
//! writes to `scale` pass through [`clamp_scale`].

use std::fmt;

use crate::FormulaId;

pub const SCALE_MIN: f64 = 0.1;
pub const SCALE_MAX: f64 = 10.0;

/// Multiplier applied per wheel tick towards the viewer.
pub const ZOOM_IN_FACTOR: f64 = 1.1;
/// Multiplier applied per wheel tick away from the viewer.
pub const ZOOM_OUT_FACTOR: f64 = 0.9;

/// Surface size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn min_dimension(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Direction of a single wheel tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    In,
    Out,
}

impl WheelDirection {
    /// Classifies a wheel delta where positive means scrolling away from the
    /// user. A zero delta carries no direction.
    pub fn from_delta(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(Self::In)
        } else if delta < 0.0 {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// Current view parameters; the single source of truth for every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    center_x: f64,
    center_y: f64,
    scale: f64,
    formula: FormulaId,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(-0.7, 0.0, 1.0, FormulaId::Julia)
    }
}

impl ViewState {
    /// Builds a view with `scale` clamped. Non-finite centers fall back to
    /// the origin.
    pub fn new(center_x: f64, center_y: f64, scale: f64, formula: FormulaId) -> Self {
        let mut view = Self {
            center_x: 0.0,
            center_y: 0.0,
            scale: 1.0,
            formula,
        };
        view.set_center_x(center_x);
        view.set_center_y(center_y);
        view.set_scale(scale);
        view
    }

    pub fn center_x(&self) -> f64 {
        self.center_x
    }

    pub fn center_y(&self) -> f64 {
        self.center_y
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn formula(&self) -> FormulaId {
        self.formula
    }

    /// Overwrites the horizontal center. Non-finite values are ignored and
    /// reported as `false`.
    pub fn set_center_x(&mut self, center_x: f64) -> bool {
        if !center_x.is_finite() {
            return false;
        }
        self.center_x = center_x;
        true
    }

    pub fn set_center_y(&mut self, center_y: f64) -> bool {
        if !center_y.is_finite() {
            return false;
        }
        self.center_y = center_y;
        true
    }

    pub fn set_formula(&mut self, formula: FormulaId) {
        self.formula = formula;
    }

    /// Stores `scale` clamped to `[SCALE_MIN, SCALE_MAX]`. NaN is ignored and
    /// reported as `false`.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        match clamp_scale(scale) {
            Some(clamped) => {
                if clamped != scale {
                    tracing::debug!(requested = scale, clamped, "scale clamped to range");
                }
                self.scale = clamped;
                true
            }
            None => false,
        }
    }

    /// Absolute center update from a pointer position in device pixels.
    pub fn pointer_moved(&mut self, x: f64, y: f64, viewport: Viewport) -> bool {
        match pointer_to_center(x, y, viewport) {
            Some((center_x, center_y)) => {
                self.set_center_x(center_x);
                self.set_center_y(center_y);
                true
            }
            None => false,
        }
    }

    pub fn wheel(&mut self, direction: WheelDirection) {
        let factor = match direction {
            WheelDirection::In => ZOOM_IN_FACTOR,
            WheelDirection::Out => ZOOM_OUT_FACTOR,
        };
        self.set_scale(self.scale * factor);
    }

    /// Two-decimal summary mirroring what the controls display.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} center=({:.2}, {:.2}) scale={:.2}",
            self.formula.display_name(),
            self.center_x,
            self.center_y,
            self.scale
        )
    }
}

pub fn clamp_scale(scale: f64) -> Option<f64> {
    if scale.is_nan() {
        return None;
    }
    Some(scale.clamp(SCALE_MIN, SCALE_MAX))
}

/// Maps a pointer position to `[-1, 1] x [1, -1]` (y grows downwards on
/// screen, upwards in parameter space). Returns `None` for an empty viewport.
pub fn pointer_to_center(x: f64, y: f64, viewport: Viewport) -> Option<(f64, f64)> {
    if viewport.is_empty() || !x.is_finite() || !y.is_finite() {
        return None;
    }
    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);
    Some(((x / width) * 2.0 - 1.0, 1.0 - (y / height) * 2.0))
}

/// Coerces raw control text into a finite number.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
