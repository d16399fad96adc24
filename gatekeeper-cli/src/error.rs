//! CLI-specific error types and exit code mapping

use gatekeeper_core::error::{GatekeeperError, RegistryError};
use gatekeeper_scanner::ScannerError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes. The `call`
/// command never surfaces these as exit codes; its failures are part of the
/// JSON response.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scan pipeline did not produce a report.
    #[error("scan failed: {0}")]
    Scan(String),

    /// Registry read or write failure.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdin read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                    |
    /// |------|----------------------------|
    /// | 0    | Success                    |
    /// | 1    | General / command error    |
    /// | 2    | Configuration error        |
    /// | 4    | Scan produced no report    |
    /// | 10   | IO error                   |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Scan(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Registry(_) => 1,
        }
    }
}

impl From<GatekeeperError> for CliError {
    fn from(e: GatekeeperError) -> Self {
        match e {
            GatekeeperError::Config(inner) => Self::Config(inner.to_string()),
            GatekeeperError::Registry(inner) => Self::Registry(inner),
            GatekeeperError::Io(inner) => Self::Io(inner),
            other => Self::Command(other.to_string()),
        }
    }
}

impl From<ScannerError> for CliError {
    fn from(e: ScannerError) -> Self {
        match e {
            ScannerError::Config { field, reason } => {
                Self::Config(format!("invalid value for '{field}': {reason}"))
            }
            other => Self::Scan(other.to_string()),
        }
    }
}
