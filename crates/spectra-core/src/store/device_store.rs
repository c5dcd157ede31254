// ── Central reactive device store ──
//
// Thread-safe storage for every normalized device across all backends.
// Mutations are broadcast to subscribers via `watch` channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{Device, DeviceKey};
use crate::stream::DeviceStream;

/// Reactive cache of normalized devices, keyed by [`DeviceKey`].
///
/// Reads are cheap `Arc` clones; writes go through the catalog, which
/// serializes them. Callers only ever receive immutable snapshots.
pub struct DeviceStore {
    pub(crate) devices: EntityCollection<DeviceKey, Device>,
    pub(crate) last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        let (last_refresh, _) = watch::channel(None);
        Self {
            devices: EntityCollection::new(),
            last_refresh,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn device(&self, key: &DeviceKey) -> Option<Arc<Device>> {
        self.devices.get(key)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Mutation counter; changes whenever any device is added, updated or removed.
    pub fn version(&self) -> u64 {
        self.devices.version()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_devices(&self) -> DeviceStream {
        DeviceStream::new(self.devices.subscribe())
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    /// Whether a discovery round has ever completed.
    pub fn is_populated(&self) -> bool {
        self.last_refresh().is_some()
    }

    /// How long ago the last refresh occurred, or `None` if never refreshed.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_refresh().map(|t| Utc::now() - t)
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}
