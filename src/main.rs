//! stagecraft CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use stagecraft::cli::{report, Arguments, ExitStatus};

fn main() -> ExitCode {
    let args = Arguments::parse();

    match stagecraft::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            report::report_error(err);
            ExitStatus::Error.into()
        }
    }
}
