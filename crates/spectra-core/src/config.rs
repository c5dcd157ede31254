// ── Runtime broker configuration ──
//
// These types describe *which* backends to load and how long to wait on
// them. They carry credential data and timeouts, but never touch disk.
// The CLI constructs a `BrokerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Which adapter to build for a configured backend.
#[derive(Debug, Clone)]
pub enum BackendKind {
    /// OpenRazer daemon over the D-Bus session bus.
    OpenRazer,
    /// JSON bridge daemon over HTTP.
    Http {
        url: Url,
        token: Option<SecretString>,
    },
    /// In-process simulated daemon.
    Memory {
        /// Seed with showcase devices.
        demo: bool,
    },
}

impl BackendKind {
    /// The configuration-file name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRazer => "openrazer",
            Self::Http { .. } => "http",
            Self::Memory { .. } => "memory",
        }
    }
}

/// One configured backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub id: String,
    pub kind: BackendKind,
    /// Disabled backends are not registered at all.
    pub enabled: bool,
}

impl BackendConfig {
    pub fn new(id: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
        }
    }
}

/// Everything the broker needs to start.
///
/// Built by the CLI -- core never reads config files.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Backends in registration order.
    pub backends: Vec<BackendConfig>,
    /// Upper bound on every backend call.
    pub call_timeout: Duration,
    /// Upper bound on liveness probes.
    pub probe_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendConfig::new("openrazer", BackendKind::OpenRazer)],
            call_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
        }
    }
}

impl BrokerConfig {
    /// A config with no backends and default timeouts.
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backends.push(backend);
        self
    }
}
