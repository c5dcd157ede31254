// ── Core error types ──
//
// User-facing errors from spectra-core. Consumers never see HTTP statuses
// or D-Bus error names directly. The `From<spectra_backend::Error>` impl
// translates adapter errors into broker-level kinds.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Backend errors ───────────────────────────────────────────────
    #[error("Backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    // ── Validation errors (never reach hardware) ─────────────────────
    #[error("Unknown device '{uid}' on backend '{backend}'")]
    UnknownDevice { backend: String, uid: String },

    #[error("Device '{device}' has no zone '{zone}'")]
    InvalidZone { device: String, zone: String },

    #[error("Zone '{zone}' does not support effect '{effect}'")]
    UnsupportedEffect { zone: String, effect: String },

    #[error("Invalid parameter for effect '{effect}': {reason}")]
    InvalidParameter { effect: String, reason: String },

    #[error("Effect '{effect}' takes {expected} colour(s), got {got}")]
    InvalidColourCount {
        effect: String,
        expected: String,
        got: usize,
    },

    #[error("Invalid colour '{value}' (expected #RRGGBB)")]
    InvalidColour { value: String },

    #[error("Pixel ({row}, {col}) is outside the {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Communication with '{device}' failed: {message}")]
    DeviceCommunication { device: String, message: String },

    #[error("'{device}' does not support {operation}")]
    Unsupported { operation: String, device: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` for errors raised locally before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownDevice { .. }
                | Self::InvalidZone { .. }
                | Self::UnsupportedEffect { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidColourCount { .. }
                | Self::InvalidColour { .. }
                | Self::OutOfRange { .. }
        )
    }

    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

// ── Conversion from adapter errors ───────────────────────────────────

impl From<spectra_backend::Error> for CoreError {
    fn from(err: spectra_backend::Error) -> Self {
        use spectra_backend::Error as E;

        match err {
            E::Unavailable { backend, reason } => Self::BackendUnavailable { backend, reason },
            E::Timeout {
                backend,
                timeout_ms,
            } => Self::BackendUnavailable {
                backend,
                reason: format!("call timed out after {timeout_ms}ms"),
            },
            E::NotFound { backend, uid } => Self::UnknownDevice { backend, uid },
            E::Unsupported {
                backend,
                uid,
                operation,
            } => Self::Unsupported {
                operation,
                device: format!("{backend}:{uid}"),
            },
            E::DeviceCommunication {
                backend,
                uid,
                message,
            } => Self::DeviceCommunication {
                device: format!("{backend}:{uid}"),
                message,
            },
            E::InvalidResponse { backend, message } => Self::DeviceCommunication {
                device: backend,
                message: format!("invalid response: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_unavailable() {
        let err: CoreError = spectra_backend::Error::Timeout {
            backend: "bridge".into(),
            timeout_ms: 250,
        }
        .into();
        assert!(err.is_backend_unavailable());
        assert!(!err.is_validation());
        assert_eq!(
            err.to_string(),
            "Backend 'bridge' is unavailable: call timed out after 250ms"
        );
    }

    #[test]
    fn device_failure_names_the_device() {
        let err: CoreError = spectra_backend::Error::DeviceCommunication {
            backend: "openrazer".into(),
            uid: "PM123".into(),
            message: "no ack".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::DeviceCommunication { ref device, .. } if device == "openrazer:PM123"
        ));
    }
}
