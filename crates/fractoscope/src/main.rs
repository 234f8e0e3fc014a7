mod cli;
mod control;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Formulas) => run::list_formulas(&cli.run),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Show => run::show_config(&cli.run),
            ConfigAction::Where => run::config_where(&cli.run),
        },
        None => run::run(cli.run),
    }
}
