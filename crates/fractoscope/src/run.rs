use std::fs;

use anyhow::{Context, Result};
use renderer::{GpuPowerPreference, RedrawPolicy, Renderer, RendererConfig};
use settings::{PowerSetting, Settings};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::control;
use crate::paths::ConfigLocation;

pub fn run(args: RunArgs) -> Result<()> {
    let settings = resolve_settings(&args)?;
    let config = renderer_config(&settings);
    tracing::info!(
        formula = %settings.view.formula,
        size = ?config.surface_size,
        power = %config.power,
        vsync = config.vsync,
        "starting fractoscope"
    );

    let renderer = Renderer::new(config)?;
    if args.stdin_controls {
        control::spawn_stdin_reader(renderer.controller())?;
        tracing::info!("reading control lines from stdin");
    }
    renderer.run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn list_formulas(args: &RunArgs) -> Result<()> {
    let kernels = resolve_settings(args)?.kernels();
    for kernel in kernels.iter() {
        let id = kernel.id();
        println!(
            "{:<14} {:<14} max_iterations={}",
            id.as_str(),
            id.display_name(),
            kernel.max_iterations()
        );
    }
    Ok(())
}

pub fn show_config(args: &RunArgs) -> Result<()> {
    let settings = resolve_settings(args)?;
    print!("{}", settings.to_toml_string()?);
    Ok(())
}

pub fn config_where(args: &RunArgs) -> Result<()> {
    let location = ConfigLocation::resolve(args.config.as_deref())?;
    let status = if location.path.is_file() {
        "present"
    } else {
        "missing; defaults apply"
    };
    println!("{} ({status})", location.path.display());
    Ok(())
}

/// File settings (or defaults) with CLI overrides applied and validated.
pub fn resolve_settings(args: &RunArgs) -> Result<Settings> {
    let location = ConfigLocation::resolve(args.config.as_deref())?;
    let mut settings = load_settings(&location)?;
    apply_overrides(&mut settings, args);
    settings
        .validate()
        .context("invalid settings after applying command-line overrides")?;
    Ok(settings)
}

fn load_settings(location: &ConfigLocation) -> Result<Settings> {
    if !location.explicit && !location.path.exists() {
        tracing::debug!(path = %location.path.display(), "no settings file; using defaults");
        return Ok(Settings::default());
    }
    let text = fs::read_to_string(&location.path)
        .with_context(|| format!("failed to read settings at {}", location.path.display()))?;
    let settings = Settings::from_toml_str(&text)
        .with_context(|| format!("failed to load settings from {}", location.path.display()))?;
    tracing::debug!(path = %location.path.display(), "loaded settings");
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, args: &RunArgs) {
    if let Some(formula) = args.formula {
        settings.view.formula = formula;
    }
    if let Some(center_x) = args.center_x {
        settings.view.center_x = center_x;
    }
    if let Some(center_y) = args.center_y {
        settings.view.center_y = center_y;
    }
    if let Some(scale) = args.scale {
        settings.view.scale = scale;
    }
    if let Some(palette) = args.julia_palette {
        settings.view.julia_palette = palette;
    }
    if let Some((width, height)) = args.size {
        settings.window.width = width;
        settings.window.height = height;
    }
    if let Some(power) = args.power {
        settings.gpu.power = power;
    }
    if args.no_vsync {
        settings.gpu.vsync = false;
    }
}

pub(crate) fn renderer_config(settings: &Settings) -> RendererConfig {
    RendererConfig {
        surface_size: (settings.window.width, settings.window.height),
        title: settings.window.title.clone(),
        initial_view: settings.initial_view(),
        julia_palette: settings.view.julia_palette,
        power: convert_gpu_power(settings.gpu.power),
        vsync: settings.gpu.vsync,
        redraw: RedrawPolicy::Coalesced,
    }
}

pub(crate) fn convert_gpu_power(value: PowerSetting) -> GpuPowerPreference {
    match value {
        PowerSetting::Low => GpuPowerPreference::Low,
        PowerSetting::High => GpuPowerPreference::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulas::{FormulaId, JuliaPalette};
    use tempfile::TempDir;

    #[test]
    fn overrides_replace_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[view]\nformula = \"julia\"\ncenter_x = 0.5\nscale = 2.0\n[gpu]\nvsync = true\n",
        )
        .unwrap();

        let args = RunArgs {
            config: Some(path),
            formula: Some(FormulaId::Lyapunov),
            scale: Some(50.0),
            size: Some((640, 480)),
            no_vsync: true,
            ..RunArgs::default()
        };
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.view.formula, FormulaId::Lyapunov);
        assert_eq!(settings.view.center_x, 0.5);
        assert!(!settings.gpu.vsync);

        let config = renderer_config(&settings);
        assert_eq!(config.surface_size, (640, 480));
        assert_eq!(config.initial_view.scale(), formulas::SCALE_MAX);
        assert_eq!(config.redraw, RedrawPolicy::Coalesced);
    }

    #[test]
    fn julia_palette_flag_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[view]\njulia_palette = \"rainbow\"\n").unwrap();

        let args = RunArgs {
            config: Some(path),
            julia_palette: Some(JuliaPalette::Grayscale),
            ..RunArgs::default()
        };
        let settings = resolve_settings(&args).unwrap();
        let config = renderer_config(&settings);
        assert_eq!(config.julia_palette, JuliaPalette::Grayscale);
        assert_eq!(config.kernels().get(FormulaId::Julia).max_iterations(), 300);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            config: Some(dir.path().join("absent.toml")),
            ..RunArgs::default()
        };
        let err = resolve_settings(&args).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }

    #[test]
    fn power_setting_maps_to_renderer() {
        assert_eq!(convert_gpu_power(PowerSetting::Low), GpuPowerPreference::Low);
        assert_eq!(convert_gpu_power(PowerSetting::High), GpuPowerPreference::High);
    }
}
