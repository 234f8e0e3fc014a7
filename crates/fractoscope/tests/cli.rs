use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn fractoscope(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fractoscope"));
    command
        .env("FRACTOSCOPE_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn formulas_lists_every_kernel() {
    let root = TempDir::new().unwrap();
    let output = fractoscope(root.path())
        .arg("formulas")
        .output()
        .expect("failed to run fractoscope formulas");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("julia"));
    assert!(lines[1].starts_with("burning-ship"));
    assert!(lines[2].starts_with("lyapunov"));
    assert!(lines.iter().all(|line| line.ends_with("max_iterations=100")));
}

#[test]
fn formulas_reports_grayscale_julia_cap() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        "[view]\njulia_palette = \"grayscale\"\n",
    )
    .unwrap();

    let output = fractoscope(root.path())
        .arg("formulas")
        .output()
        .expect("failed to run fractoscope formulas");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("julia"));
    assert!(lines[0].ends_with("max_iterations=300"));
    assert!(lines[1].ends_with("max_iterations=100"));
}

#[test]
fn config_show_merges_file_and_flags() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("view.toml");
    fs::write(
        &config_path,
        "[view]\nformula = \"burning_ship\"\ncenter_x = 0.25\n\n[window]\ntitle = \"ship\"\n",
    )
    .unwrap();

    let output = fractoscope(root.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--scale", "4", "--no-vsync", "config", "show"])
        .output()
        .expect("failed to run fractoscope config show");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("formula = \"burning-ship\""));
    assert!(stdout.contains("center_x = 0.25"));
    assert!(stdout.contains("scale = 4.0"));
    assert!(stdout.contains("title = \"ship\""));
    assert!(stdout.contains("vsync = false"));
}

#[test]
fn config_show_uses_defaults_without_a_file() {
    let root = TempDir::new().unwrap();
    let output = fractoscope(root.path())
        .args(["config", "show"])
        .output()
        .expect("failed to run fractoscope config show");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("formula = \"julia\""));
    assert!(stdout.contains("center_x = -0.7"));
}

#[test]
fn config_show_rejects_unknown_formula() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        "[view]\nformula = \"mandelbrot\"\n",
    )
    .unwrap();

    let output = fractoscope(root.path())
        .args(["config", "show"])
        .output()
        .expect("failed to run fractoscope config show");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mandelbrot"), "stderr: {stderr}");
}

#[test]
fn config_where_reports_env_directory() {
    let root = TempDir::new().unwrap();
    let output = fractoscope(root.path())
        .args(["config", "where"])
        .output()
        .expect("failed to run fractoscope config where");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let expected = root.path().join("config.toml");
    assert!(stdout.contains(&expected.display().to_string()));
    assert!(stdout.contains("missing"));
}
