// ── Backend registry ──
//
// Owns the configured backend adapters and their liveness. Adapters are
// built once at startup; a construction failure is remembered rather
// than retried on every call. Availability is observable through a
// `watch` channel per backend.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use spectra_backend::{Backend, HttpBackend, MemoryBackend, TimedBackend, TransportConfig};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, BackendKind, BrokerConfig};

// ── Availability ─────────────────────────────────────────────────────

/// Liveness of one backend, as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Never probed.
    Unknown,
    Available,
    /// Last probe or call could not reach the daemon.
    Unavailable { reason: String },
    /// The adapter could not be constructed; stays failed until an
    /// explicit [`BackendHandle::probe`].
    Failed { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Unavailable { reason } | Self::Failed { reason } => Some(reason),
            Self::Unknown | Self::Available => None,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Available => f.write_str("available"),
            Self::Unavailable { .. } => f.write_str("unavailable"),
            Self::Failed { .. } => f.write_str("failed"),
        }
    }
}

// ── Adapter construction ─────────────────────────────────────────────

async fn build_adapter(
    config: &BackendConfig,
    call_timeout: Duration,
) -> Result<Arc<dyn Backend>, spectra_backend::Error> {
    let adapter: Arc<dyn Backend> = match config.kind {
        #[cfg(feature = "openrazer")]
        BackendKind::OpenRazer => {
            Arc::new(spectra_backend::OpenRazerBackend::connect(config.id.clone()).await?)
        }
        #[cfg(not(feature = "openrazer"))]
        BackendKind::OpenRazer => {
            return Err(spectra_backend::Error::Unavailable {
                backend: config.id.clone(),
                reason: "built without openrazer support".into(),
            });
        }
        BackendKind::Http { ref url, ref token } => {
            let mut transport = TransportConfig::default().with_timeout(call_timeout);
            transport.token.clone_from(token);
            Arc::new(HttpBackend::new(config.id.clone(), url.as_str(), &transport)?)
        }
        BackendKind::Memory { demo } => {
            if demo {
                Arc::new(MemoryBackend::demo(config.id.clone()))
            } else {
                Arc::new(MemoryBackend::new(config.id.clone()))
            }
        }
    };
    Ok(adapter)
}

fn timed(
    adapter: Arc<dyn Backend>,
    call_timeout: Duration,
    probe_timeout: Duration,
) -> Arc<dyn Backend> {
    Arc::new(TimedBackend::new(adapter, call_timeout).with_probe_timeout(probe_timeout))
}

// ── BackendHandle ────────────────────────────────────────────────────

/// Shared handle to one registered backend.
///
/// Cheaply cloneable. Holds the (possibly absent) adapter and its
/// availability flag.
#[derive(Clone)]
pub struct BackendHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: String,
    /// `None` for injected adapters, which cannot be rebuilt.
    config: Option<BackendConfig>,
    call_timeout: Duration,
    probe_timeout: Duration,
    adapter: RwLock<Option<Arc<dyn Backend>>>,
    availability: watch::Sender<Availability>,
    last_probe: watch::Sender<Option<DateTime<Utc>>>,
}

impl BackendHandle {
    fn new(
        id: String,
        config: Option<BackendConfig>,
        adapter: Option<Arc<dyn Backend>>,
        initial: Availability,
        call_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        let (availability, _) = watch::channel(initial);
        let (last_probe, _) = watch::channel(None);
        Self {
            inner: Arc::new(HandleInner {
                id,
                config,
                call_timeout,
                probe_timeout,
                adapter: RwLock::new(adapter),
                availability,
                last_probe,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The configured kind, or `"injected"` for adapters supplied directly.
    pub fn kind(&self) -> &'static str {
        self.inner
            .config
            .as_ref()
            .map_or("injected", |c| c.kind.as_str())
    }

    /// Current availability without probing.
    pub fn availability(&self) -> Availability {
        self.inner.availability.borrow().clone()
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<Availability> {
        self.inner.availability.subscribe()
    }

    pub fn last_probe(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_probe.borrow()
    }

    /// The constructed adapter, if construction succeeded.
    pub async fn adapter(&self) -> Option<Arc<dyn Backend>> {
        self.inner.adapter.read().await.clone()
    }

    /// Whether the daemon is reachable.
    ///
    /// Probes only while availability is still [`Availability::Unknown`];
    /// afterwards returns the cached result until [`probe`](Self::probe)
    /// is called explicitly.
    pub async fn is_available(&self) -> bool {
        match self.availability() {
            Availability::Unknown => self.probe().await.is_available(),
            other => other.is_available(),
        }
    }

    /// Force a liveness probe. A backend whose construction failed is
    /// rebuilt from its configuration first.
    pub async fn probe(&self) -> Availability {
        if self.availability().is_failed() {
            if let Some(ref config) = self.inner.config {
                match build_adapter(config, self.inner.call_timeout).await {
                    Ok(adapter) => {
                        info!(backend = %self.inner.id, "backend adapter rebuilt");
                        *self.inner.adapter.write().await = Some(timed(
                            adapter,
                            self.inner.call_timeout,
                            self.inner.probe_timeout,
                        ));
                    }
                    Err(e) => {
                        let state = Availability::Failed {
                            reason: e.to_string(),
                        };
                        self.set(state.clone());
                        return state;
                    }
                }
            }
        }

        let Some(adapter) = self.adapter().await else {
            return self.availability();
        };

        let state = match adapter.probe().await {
            Ok(()) => Availability::Available,
            Err(e) => Availability::Unavailable {
                reason: e.to_string(),
            },
        };
        debug!(backend = %self.inner.id, %state, "probed backend");
        let _ = self.inner.last_probe.send_replace(Some(Utc::now()));
        self.set(state.clone());
        state
    }

    // ── Crate-internal updates from observed calls ───────────────────

    pub(crate) fn mark_available(&self) {
        if !self.availability().is_failed() {
            self.set(Availability::Available);
        }
    }

    pub(crate) fn mark_unavailable(&self, reason: impl Into<String>) {
        if !self.availability().is_failed() {
            self.set(Availability::Unavailable {
                reason: reason.into(),
            });
        }
    }

    fn set(&self, state: Availability) {
        self.inner.availability.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("id", &self.inner.id)
            .field("kind", &self.kind())
            .field("availability", &self.availability())
            .finish_non_exhaustive()
    }
}

// ── BackendRegistry ──────────────────────────────────────────────────

/// The set of registered backends, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    handles: Vec<BackendHandle>,
}

impl BackendRegistry {
    /// Build an adapter for every enabled backend in `config`.
    ///
    /// Construction failures are recorded as [`Availability::Failed`];
    /// the backend stays registered so it can be listed and re-probed.
    pub async fn init(config: &BrokerConfig) -> Self {
        let mut handles: Vec<BackendHandle> = Vec::with_capacity(config.backends.len());

        for backend in &config.backends {
            if !backend.enabled {
                debug!(backend = %backend.id, "backend disabled, not registering");
                continue;
            }
            if handles.iter().any(|h| h.id() == backend.id) {
                warn!(backend = %backend.id, "duplicate backend id, ignoring");
                continue;
            }

            let (adapter, initial) = match build_adapter(backend, config.call_timeout).await {
                Ok(adapter) => (
                    Some(timed(adapter, config.call_timeout, config.probe_timeout)),
                    Availability::Unknown,
                ),
                Err(e) => {
                    warn!(backend = %backend.id, error = %e, "backend construction failed");
                    (
                        None,
                        Availability::Failed {
                            reason: e.to_string(),
                        },
                    )
                }
            };

            handles.push(BackendHandle::new(
                backend.id.clone(),
                Some(backend.clone()),
                adapter,
                initial,
                config.call_timeout,
                config.probe_timeout,
            ));
        }

        info!(count = handles.len(), "backend registry initialised");
        Self { handles }
    }

    /// Register pre-built adapters. Each is wrapped in a [`TimedBackend`].
    pub fn from_adapters(
        adapters: Vec<Arc<dyn Backend>>,
        call_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        let mut handles: Vec<BackendHandle> = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let id = adapter.id().to_owned();
            if handles.iter().any(|h| h.id() == id) {
                warn!(backend = %id, "duplicate backend id, ignoring");
                continue;
            }
            handles.push(BackendHandle::new(
                id,
                None,
                Some(timed(adapter, call_timeout, probe_timeout)),
                Availability::Unknown,
                call_timeout,
                probe_timeout,
            ));
        }
        Self { handles }
    }

    /// Look up a registered backend. Never constructs one on demand.
    pub fn get_backend(&self, id: &str) -> Option<BackendHandle> {
        self.handles.iter().find(|h| h.id() == id).cloned()
    }

    /// All registered ids, regardless of availability.
    pub fn list_backends(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.id().to_owned()).collect()
    }

    pub fn handles(&self) -> &[BackendHandle] {
        &self.handles
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;

    fn memory(id: &str) -> BackendConfig {
        BackendConfig::new(id, BackendKind::Memory { demo: true })
    }

    #[tokio::test]
    async fn disabled_backends_are_not_registered() {
        let mut off = memory("off");
        off.enabled = false;
        let config = BrokerConfig::empty()
            .with_backend(memory("on"))
            .with_backend(off);

        let registry = BackendRegistry::init(&config).await;
        assert_eq!(registry.list_backends(), vec!["on".to_owned()]);
        assert!(registry.get_backend("off").is_none());
    }

    #[tokio::test]
    async fn availability_is_cached_until_explicit_probe() {
        let backend = Arc::new(MemoryBackend::demo("mem"));
        let registry = BackendRegistry::from_adapters(
            vec![backend.clone() as Arc<dyn Backend>],
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let handle = registry.get_backend("mem").unwrap();
        assert_eq!(handle.availability(), Availability::Unknown);

        assert!(handle.is_available().await);
        backend.set_online(false);
        assert!(handle.is_available().await, "cached until re-probed");

        assert!(!handle.probe().await.is_available());
        assert!(!handle.is_available().await);
        assert!(handle.last_probe().is_some());
    }

    #[tokio::test]
    async fn construction_failure_is_permanent_until_probe() {
        let config = BrokerConfig::empty().with_backend(BackendConfig::new(
            "bridge",
            BackendKind::Http {
                url: Url::parse("ftp://example.invalid/").unwrap(),
                token: None,
            },
        ));

        let registry = BackendRegistry::init(&config).await;
        let handle = registry.get_backend("bridge").unwrap();
        assert!(handle.availability().is_failed());
        assert!(handle.adapter().await.is_none());
        assert!(!handle.is_available().await);

        let mut rx = handle.subscribe_availability();
        let state = handle.probe().await;
        assert!(state.is_failed());
        assert!(!rx.has_changed().unwrap());

        handle.mark_available();
        assert!(handle.availability().is_failed());
    }
}
