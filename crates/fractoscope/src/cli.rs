use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formulas::{FormulaId, JuliaPalette};
use settings::PowerSetting;

#[derive(Parser, Debug)]
#[command(
    name = "fractoscope",
    author,
    version,
    about = "Interactive GPU visualizer for Julia, Burning Ship and Lyapunov fractals",
    allow_negative_numbers = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Formula to open with: `julia`, `burning-ship` or `lyapunov`.
    #[arg(long, value_name = "NAME", value_parser = parse_formula)]
    pub formula: Option<FormulaId>,

    /// Initial view center, x component.
    #[arg(long, value_name = "X", value_parser = parse_finite)]
    pub center_x: Option<f64>,

    /// Initial view center, y component.
    #[arg(long, value_name = "Y", value_parser = parse_finite)]
    pub center_y: Option<f64>,

    /// Initial zoom; clamped to 0.1..=10.
    #[arg(long, value_name = "SCALE", value_parser = parse_scale)]
    pub scale: Option<f64>,

    /// Julia colouring: `rainbow` (100 iterations) or `grayscale` (300).
    #[arg(long, value_name = "PALETTE", value_parser = parse_julia_palette)]
    pub julia_palette: Option<JuliaPalette>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Settings file; defaults to `config.toml` in the user config directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// GPU power preference: `low` or `high`.
    #[arg(long, value_name = "PREFERENCE", value_parser = parse_power)]
    pub power: Option<PowerSetting>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// Read control lines (`formula ship`, `scale 2.5`, ...) from stdin.
    #[arg(long)]
    pub stdin_controls: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the supported formulas.
    Formulas,
    /// Inspect the resolved configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings as TOML.
    Show,
    /// Print the settings file location.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_formula(value: &str) -> Result<FormulaId, String> {
    value.parse::<FormulaId>().map_err(|err| err.to_string())
}

pub fn parse_finite(value: &str) -> Result<f64, String> {
    formulas::view::parse_numeric(value)
        .ok_or_else(|| format!("'{value}' is not a finite number"))
}

pub fn parse_scale(value: &str) -> Result<f64, String> {
    let scale = parse_finite(value)?;
    if scale <= 0.0 {
        return Err(format!("scale must be positive, got {scale}"));
    }
    Ok(scale)
}

pub fn parse_julia_palette(value: &str) -> Result<JuliaPalette, String> {
    value.parse::<JuliaPalette>()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got {width}x{height}"));
    }
    Ok((width, height))
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(PowerSetting::Low),
        "high" | "high-performance" | "discrete" => Ok(PowerSetting::High),
        other => Err(format!(
            "invalid power preference '{other}'; expected low or high"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_accepts_either_separator_case() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 640X480 ").unwrap(), (640, 480));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn power_aliases() {
        assert_eq!(parse_power("LOW").unwrap(), PowerSetting::Low);
        assert_eq!(parse_power("discrete").unwrap(), PowerSetting::High);
        assert!(parse_power("medium").is_err());
    }

    #[test]
    fn scale_must_be_positive() {
        assert_eq!(parse_scale("2.5").unwrap(), 2.5);
        assert!(parse_scale("0").is_err());
        assert!(parse_scale("-1").is_err());
        assert!(parse_scale("nan").is_err());
    }

    #[test]
    fn julia_palette_rejects_unknown_names() {
        assert_eq!(parse_julia_palette("rainbow").unwrap(), JuliaPalette::Rainbow);
        let err = parse_julia_palette("sepia").unwrap_err();
        assert!(err.contains("sepia"));
    }

    #[test]
    fn formula_errors_mention_input() {
        assert_eq!(parse_formula("burningShip").unwrap(), FormulaId::BurningShip);
        let err = parse_formula("mandelbrot").unwrap_err();
        assert!(err.contains("mandelbrot"));
    }

    #[test]
    fn parses_run_flags_and_subcommands() {
        let cli = Cli::try_parse_from([
            "fractoscope",
            "--formula",
            "lyapunov",
            "--center-x",
            "-0.5",
            "--scale",
            "3",
            "--no-vsync",
            "--julia-palette",
            "grayscale",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.formula, Some(FormulaId::Lyapunov));
        assert_eq!(cli.run.center_x, Some(-0.5));
        assert_eq!(cli.run.scale, Some(3.0));
        assert!(cli.run.no_vsync);
        assert_eq!(cli.run.julia_palette, Some(JuliaPalette::Grayscale));

        let cli = Cli::try_parse_from(["fractoscope", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Show
            }))
        ));
    }
}
