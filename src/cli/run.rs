//! Command dispatcher.

use std::path::Path;

use anyhow::Result;

use super::args::{Arguments, Command, OutputFormat};
use super::commands;
use super::exit_status::ExitStatus;
use crate::config::load_config;

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    let loaded = load_config(Path::new("."))?;
    let config = loaded.config;

    let (value, format) = match command {
        Command::Resolve(cmd) => {
            let format = cmd.common.format;
            (commands::resolve(cmd, config)?, format)
        }
        Command::Keys(cmd) => {
            let format = cmd.common.format;
            (commands::keys(cmd, config)?, format)
        }
        Command::Artifacts(cmd) => {
            let format = cmd.common.format;
            (commands::artifacts(cmd, config)?, format)
        }
        Command::Datasets(cmd) => {
            let format = cmd.common.format;
            (commands::datasets(cmd, config)?, format)
        }
        Command::Metrics(cmd) => {
            let format = cmd.common.format;
            (commands::metrics(cmd, config)?, format)
        }
        Command::Params(cmd) => {
            let format = cmd.common.format;
            (commands::params(cmd, config)?, format)
        }
        Command::Plots(cmd) => {
            let format = cmd.common.format;
            (commands::plots(cmd, config)?, format)
        }
    };

    print_value(&value, format)?;
    Ok(ExitStatus::Success)
}

fn print_value(value: &serde_json::Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
