use std::process::ExitCode;

/// Exit status for CLI commands, following common conventions for
/// resolver/build tools.
///
/// - `Success` (0): Command completed successfully.
/// - `Error` (1): Resolution failed (bad document, unresolved placeholder,
///   missing parameter file, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Error => ExitCode::from(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::from(ExitStatus::Success), ExitCode::from(0));
        assert_eq!(ExitCode::from(ExitStatus::Error), ExitCode::from(1));
    }
}
