use thiserror::Error;

/// Top-level error type for the `spectra-backend` crate.
///
/// Every adapter translates its transport failures (HTTP, D-Bus, in-process)
/// into one of these kinds before returning, so `spectra-core` never has to
/// look at a raw `reqwest` or `zbus` error.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Availability ────────────────────────────────────────────────
    /// The daemon behind this backend is not reachable (not running,
    /// socket or bus name absent, connection refused).
    #[error("Backend '{backend}' unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    /// The call did not complete within the adapter's time budget.
    #[error("Backend '{backend}' timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },

    // ── Lookup ──────────────────────────────────────────────────────
    /// The daemon does not know a device with this uid.
    #[error("Device '{uid}' not found on backend '{backend}'")]
    NotFound { backend: String, uid: String },

    /// The device exists but does not support the requested operation.
    #[error("Device '{uid}' on backend '{backend}' does not support {operation}")]
    Unsupported {
        backend: String,
        uid: String,
        operation: String,
    },

    // ── Device I/O ──────────────────────────────────────────────────
    /// The daemon accepted the call but the device operation failed.
    #[error("Device '{uid}' on backend '{backend}' failed: {message}")]
    DeviceCommunication {
        backend: String,
        uid: String,
        message: String,
    },

    /// The daemon replied with something we could not interpret.
    #[error("Invalid response from backend '{backend}': {message}")]
    InvalidResponse { backend: String, message: String },
}

impl Error {
    /// Returns `true` if this error means the daemon itself could not be
    /// reached for this attempt (including timeouts).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the device does not support the operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// The id of the backend that produced this error.
    pub fn backend(&self) -> &str {
        match self {
            Self::Unavailable { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::NotFound { backend, .. }
            | Self::Unsupported { backend, .. }
            | Self::DeviceCommunication { backend, .. }
            | Self::InvalidResponse { backend, .. } => backend,
        }
    }

    pub(crate) fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(backend: &str, uid: &str) -> Self {
        Self::NotFound {
            backend: backend.to_owned(),
            uid: uid.to_owned(),
        }
    }

    pub(crate) fn unsupported(backend: &str, uid: &str, operation: &str) -> Self {
        Self::Unsupported {
            backend: backend.to_owned(),
            uid: uid.to_owned(),
            operation: operation.to_owned(),
        }
    }

    pub(crate) fn device(backend: &str, uid: &str, message: impl Into<String>) -> Self {
        Self::DeviceCommunication {
            backend: backend.to_owned(),
            uid: uid.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(backend: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.to_owned(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
