use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use renderer::{ControlInput, Controller};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown control '{0}' (expected formula, center-x, center-y, scale or quit)")]
    UnknownControl(String),
    #[error("control '{0}' needs a value")]
    MissingValue(String),
}

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLine {
    Input(ControlInput),
    Quit,
}

/// Parses one `name value` control line. Blank lines and `#` comments yield
/// `None`; values are passed through as text for the engine to coerce.
pub fn parse_control_line(line: &str) -> Result<Option<ControlLine>, InputError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (name, value) = match trimmed.split_once(char::is_whitespace) {
        Some((name, value)) => (name, value.trim()),
        None => (trimmed, ""),
    };
    let name = name.to_ascii_lowercase();
    if matches!(name.as_str(), "quit" | "exit") {
        return Ok(Some(ControlLine::Quit));
    }
    let build: fn(String) -> ControlInput = match name.as_str() {
        "formula" => ControlInput::Formula,
        "center-x" | "center_x" | "cx" => ControlInput::CenterX,
        "center-y" | "center_y" | "cy" => ControlInput::CenterY,
        "scale" | "zoom" => ControlInput::Scale,
        _ => return Err(InputError::UnknownControl(name)),
    };
    if value.is_empty() {
        return Err(InputError::MissingValue(name));
    }
    Ok(Some(ControlLine::Input(build(value.to_string()))))
}

/// Forwards stdin control lines to the window until EOF, a `quit` line, or
/// the window going away.
pub fn spawn_stdin_reader(controller: Controller) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("fractoscope-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!("failed to read control line: {err}");
                        break;
                    }
                };
                match parse_control_line(&line) {
                    Ok(Some(ControlLine::Input(input))) => {
                        if let Err(err) = controller.send(input) {
                            tracing::debug!("stopping stdin controls: {err}");
                            break;
                        }
                    }
                    Ok(Some(ControlLine::Quit)) => {
                        if let Err(err) = controller.shutdown() {
                            tracing::debug!("window already closed: {err}");
                        }
                        break;
                    }
                    Ok(None) => {}
                    Err(err) => tracing::warn!("{err}"),
                }
            }
        })
        .map_err(|err| anyhow!("failed to spawn stdin control thread: {err}"))
}
