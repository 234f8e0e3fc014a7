use std::fmt;

use formulas::{FormulaId, JuliaPalette, KernelSet, ViewState};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub gpu: GpuSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewSettings {
    pub formula: FormulaId,
    pub center_x: f64,
    pub center_y: f64,
    #[serde(deserialize_with = "deserialize_scale")]
    pub scale: f64,
    pub julia_palette: JuliaPalette,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuSettings {
    pub power: PowerSetting,
    pub vsync: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            view: ViewSettings::default(),
            window: WindowSettings::default(),
            gpu: GpuSettings::default(),
        }
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            formula: FormulaId::Julia,
            center_x: -0.7,
            center_y: 0.0,
            scale: 1.0,
            julia_palette: JuliaPalette::default(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "fractoscope".to_string(),
        }
    }
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            power: PowerSetting::default(),
            vsync: true,
        }
    }
}

impl Settings {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Invalid(format!("failed to serialize settings: {err}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CURRENT_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {} (expected {CURRENT_VERSION})",
                self.version
            )));
        }
        if !self.view.center_x.is_finite() || !self.view.center_y.is_finite() {
            return Err(ConfigError::Invalid(
                "view center must be a finite number".to_string(),
            ));
        }
        if !self.view.scale.is_finite() || self.view.scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "view scale must be positive and finite, got {}",
                self.view.scale
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }

    /// Startup view; scale is clamped here, not rejected.
    pub fn initial_view(&self) -> ViewState {
        ViewState::new(
            self.view.center_x,
            self.view.center_y,
            self.view.scale,
            self.view.formula,
        )
    }

    /// Built-in kernels with the configured Julia palette.
    pub fn kernels(&self) -> KernelSet {
        KernelSet::builtin().with_julia_palette(self.view.julia_palette)
    }
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn deserialize_scale<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a positive, finite zoom scale")
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v <= 0.0 {
                return Err(E::custom(format!("scale must be positive and finite, got {v}")));
            }
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            self.visit_f64(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            self.visit_f64(v as f64)
        }
    }

    deserializer.deserialize_any(Visitor)
}
