//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use spectra_config::ConfigError;
use spectra_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Backends ─────────────────────────────────────────────────────
    #[error("Backend '{backend}' is unavailable: {reason}")]
    #[diagnostic(
        code(spectra::backend_unavailable),
        help(
            "Check that the lighting daemon is running.\n\
             Run: spectra backends list"
        )
    )]
    BackendUnavailable { backend: String, reason: String },

    #[error("Communication with '{device}' failed: {message}")]
    #[diagnostic(
        code(spectra::device_communication),
        help("The daemon accepted the request but the device did not. Retrying may help.")
    )]
    DeviceCommunication { device: String, message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(spectra::not_found),
        help("Run: spectra {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("'{device}' does not support {operation}")]
    #[diagnostic(code(spectra::unsupported))]
    Unsupported { operation: String, device: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(spectra::validation),
        help("Run: spectra devices get <BACKEND> <UID> to see each zone's effects")
    )]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(spectra::config),
        help("Run: spectra config path to locate the config file")
    )]
    Config(Box<ConfigError>),

    // ── Batches ──────────────────────────────────────────────────────
    #[error("{failed} of {total} devices failed")]
    #[diagnostic(code(spectra::partial_failure))]
    PartialFailure { failed: usize, total: usize },
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BackendUnavailable { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } => exit_code::USAGE,
            Self::DeviceCommunication { .. } | Self::Config(_) | Self::PartialFailure { .. } => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::BackendUnavailable { backend, reason } => {
                Self::BackendUnavailable { backend, reason }
            }

            CoreError::UnknownDevice { backend, uid } => Self::NotFound {
                resource_type: "device".into(),
                identifier: format!("{backend}:{uid}"),
                list_command: "devices list".into(),
            },

            CoreError::InvalidZone { .. } => Self::Validation {
                field: "zone".into(),
                reason: err.to_string(),
            },
            CoreError::UnsupportedEffect { .. } => Self::Validation {
                field: "effect".into(),
                reason: err.to_string(),
            },
            CoreError::InvalidParameter { .. } => Self::Validation {
                field: "param".into(),
                reason: err.to_string(),
            },
            CoreError::InvalidColourCount { .. } | CoreError::InvalidColour { .. } => {
                Self::Validation {
                    field: "colour".into(),
                    reason: err.to_string(),
                }
            }
            CoreError::OutOfRange { .. } => Self::Validation {
                field: "pixel".into(),
                reason: err.to_string(),
            },

            CoreError::DeviceCommunication { device, message } => {
                Self::DeviceCommunication { device, message }
            }

            CoreError::Unsupported { operation, device } => {
                Self::Unsupported { operation, device }
            }

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
