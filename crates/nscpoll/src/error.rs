//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nscpoll_config::ConfigError;
use nscpoll_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const UNREACHABLE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("No devices configured")]
    #[diagnostic(
        code(nscpoll::no_devices),
        help(
            "Add at least one [[devices]] table to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoDevices { path: String },

    #[error("Configuration in {path} is invalid")]
    #[diagnostic(code(nscpoll::invalid_config), help("{details}"))]
    InvalidConfig { path: String, details: String },

    #[error("No password for device '{device}'")]
    #[diagnostic(
        code(nscpoll::no_credentials),
        help(
            "Export ${env}, store it in the keyring under service 'nscpoll',\n\
             entry '{device}/password', or set `password` in the config."
        )
    )]
    NoCredentials { device: String, env: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nscpoll::validation))]
    Validation { field: String, reason: String },

    #[error("Config loading failed")]
    #[diagnostic(code(nscpoll::config), help("{message}"))]
    Config { message: String },

    // ── Polling ──────────────────────────────────────────────────────
    #[error("Device selection matched nothing: {names}")]
    #[diagnostic(
        code(nscpoll::unknown_device),
        help("Run: nscpoll check-config to list configured devices")
    )]
    UnknownDevice { names: String },

    #[error("{count} device(s) could not be polled: {names}")]
    #[diagnostic(
        code(nscpoll::unreachable),
        help("Check the agent addresses and credentials; run with -v for details.")
    )]
    Unreachable { count: usize, names: String },

    #[error(transparent)]
    #[diagnostic(code(nscpoll::core))]
    Core(CoreError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON output: {0}")]
    #[diagnostic(code(nscpoll::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoDevices { .. }
            | Self::InvalidConfig { .. }
            | Self::NoCredentials { .. }
            | Self::Config { .. }
            | Self::Core(CoreError::Client { .. }) => exit_code::CONFIG,
            Self::Validation { .. } | Self::UnknownDevice { .. } => exit_code::USAGE,
            Self::Unreachable { .. } => exit_code::UNREACHABLE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the config file path to a `ConfigError`.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        let path = path.display().to_string();
        match err {
            ConfigError::NoDevices => Self::NoDevices { path },
            ConfigError::Invalid(issues) => Self::InvalidConfig {
                path,
                details: issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
            ConfigError::NoCredentials { device, env } => Self::NoCredentials { device, env },
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => CliError::Validation {
                field: "devices".into(),
                reason: message,
            },
            other => CliError::Core(other),
        }
    }
}
