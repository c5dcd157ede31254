// ── Device catalog ──
//
// Discovery, normalization and caching of devices across every backend.
// All cache mutation (refresh, lazy fetch, optimistic state updates)
// goes through the single writer lock held here; reads are lock-free
// snapshot clones from the store.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::convert::normalize;
use crate::error::CoreError;
use crate::model::{Device, DeviceKey, DeviceSummary, ZoneState};
use crate::registry::BackendRegistry;
use crate::store::DeviceStore;
use crate::stream::DeviceStream;

/// Outcome of one discovery round.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// Backends whose discovery succeeded.
    pub refreshed: Vec<String>,
    /// Backends whose discovery failed; their cached devices were dropped.
    pub failed: Vec<(String, CoreError)>,
    /// Backends without a constructed adapter.
    pub skipped: Vec<String>,
    /// Devices cached after the round.
    pub device_count: usize,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Cache of normalized devices, fed by the registered backends.
pub struct DeviceCatalog {
    registry: BackendRegistry,
    store: Arc<DeviceStore>,
    writer: Mutex<()>,
}

impl DeviceCatalog {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            store: Arc::new(DeviceStore::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.store
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Rediscover every backend.
    ///
    /// Backends are queried concurrently; results are applied one backend
    /// at a time. A backend that fails loses its cached devices without
    /// affecting the others.
    pub async fn refresh(&self) -> RefreshReport {
        let _guard = self.writer.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        let mut targets = Vec::with_capacity(self.registry.handles().len());
        for handle in self.registry.handles() {
            match handle.adapter().await {
                Some(adapter) => targets.push((handle.clone(), adapter)),
                None => {
                    debug!(backend = %handle.id(), "no adapter, skipping discovery");
                    report.skipped.push(handle.id().to_owned());
                }
            }
        }

        let results = join_all(targets.iter().map(|(_, adapter)| adapter.discover())).await;

        for ((handle, _), result) in targets.iter().zip(results) {
            let id = handle.id();
            match result {
                Ok(raw) => {
                    let devices: Vec<Device> =
                        raw.into_iter().map(|r| normalize(id, r)).collect();
                    debug!(backend = %id, count = devices.len(), "discovered devices");
                    handle.mark_available();
                    self.store.apply_backend_snapshot(id, devices);
                    report.refreshed.push(id.to_owned());
                }
                Err(e) => {
                    let dropped = self.store.drop_backend(id);
                    warn!(backend = %id, error = %e, dropped, "discovery failed");
                    handle.mark_unavailable(e.to_string());
                    report.failed.push((id.to_owned(), CoreError::from(e)));
                }
            }
        }

        self.store.mark_refreshed();
        report.device_count = self.store.device_count();
        info!(
            devices = report.device_count,
            failed = report.failed.len(),
            "device catalog refreshed"
        );
        report
    }

    async fn ensure_populated(&self) {
        if self.store.is_populated() {
            return;
        }
        let _guard = self.writer.lock().await;
        if !self.store.is_populated() {
            self.refresh_locked().await;
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Summaries of every cached device, sorted by backend, name and uid.
    ///
    /// Triggers one discovery round if none has run yet.
    pub async fn device_list(&self) -> Vec<DeviceSummary> {
        self.ensure_populated().await;
        let mut list: Vec<DeviceSummary> = self
            .store
            .devices_snapshot()
            .iter()
            .map(|d| d.summary())
            .collect();
        list.sort_by(|a, b| {
            (&a.backend, &a.name, &a.uid).cmp(&(&b.backend, &b.name, &b.uid))
        });
        list
    }

    /// The subset of [`device_list`](Self::device_list) with the given form factor id.
    pub async fn filtered_device_list(&self, form_factor: &str) -> Vec<DeviceSummary> {
        self.device_list()
            .await
            .into_iter()
            .filter(|d| d.form_factor.id.eq_ignore_ascii_case(form_factor))
            .collect()
    }

    /// Full descriptor of every cached device.
    pub async fn device_all(&self) -> Vec<Arc<Device>> {
        self.ensure_populated().await;
        self.store.devices_snapshot().iter().cloned().collect()
    }

    /// Look up one device, fetching it from its backend on a cache miss.
    ///
    /// Returns `None` for unknown backends, unknown uids and backend
    /// failures alike; failures are logged.
    pub async fn get_device(&self, backend: &str, uid: &str) -> Option<Arc<Device>> {
        let key = DeviceKey::new(backend, uid);
        if let Some(device) = self.store.device(&key) {
            return Some(device);
        }

        let handle = self.registry.get_backend(backend)?;
        let adapter = handle.adapter().await?;

        let _guard = self.writer.lock().await;
        if let Some(device) = self.store.device(&key) {
            return Some(device);
        }

        match adapter.get_device(uid).await {
            Ok(raw) => {
                let device = normalize(backend, raw);
                if device.key != key {
                    warn!(
                        requested = %key,
                        reported = %device.key,
                        "backend answered with a different uid"
                    );
                    return None;
                }
                handle.mark_available();
                self.store.put_device(device);
                self.store.device(&key)
            }
            Err(e) if e.is_not_found() => {
                debug!(device = %key, "device not found");
                None
            }
            Err(e) => {
                if e.is_unavailable() {
                    handle.mark_unavailable(e.to_string());
                }
                warn!(device = %key, error = %e, "device lookup failed");
                None
            }
        }
    }

    pub fn subscribe(&self) -> DeviceStream {
        self.store.subscribe_devices()
    }

    // ── Writes from the dispatcher ───────────────────────────────────

    /// Apply `update` to the cached state of one zone.
    ///
    /// No-op when the device has left the cache in the meantime.
    pub(crate) async fn update_zone_state(
        &self,
        key: &DeviceKey,
        zone: &str,
        update: impl FnOnce(&mut ZoneState),
    ) {
        let _guard = self.writer.lock().await;
        let Some(current) = self.store.device(key) else {
            debug!(device = %key, "device gone before state update");
            return;
        };
        let mut device = Device::clone(&current);
        update(device.state.entry(zone.to_owned()).or_default());
        self.store.put_device(device);
    }
}
