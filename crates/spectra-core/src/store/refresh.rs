// ── Refresh application logic ──
//
// Applies per-backend discovery results into the DeviceStore. Each
// backend owns a disjoint slice of the key space, so one backend's
// refresh never touches another's devices.

use std::collections::HashSet;

use chrono::Utc;
use tracing::warn;

use super::DeviceStore;
use crate::model::{Device, DeviceKey};

impl DeviceStore {
    /// Replace everything `backend` owns with `devices`.
    ///
    /// Uses upsert-then-prune: incoming devices are upserted first, then
    /// any of this backend's keys not present in the incoming set are
    /// removed. Duplicate uids within one round keep the first report.
    pub(crate) fn apply_backend_snapshot(&self, backend: &str, devices: Vec<Device>) {
        let mut incoming: HashSet<DeviceKey> = HashSet::with_capacity(devices.len());
        for device in devices {
            if !incoming.insert(device.key.clone()) {
                warn!(device = %device.key, "backend reported duplicate uid, keeping the first");
                continue;
            }
            self.devices.upsert(device.key.clone(), device);
        }

        for stale in self
            .devices
            .keys_where(|k| k.backend == backend && !incoming.contains(k))
        {
            self.devices.remove(&stale);
        }
    }

    /// Drop every cached device owned by `backend`. Returns how many were removed.
    pub(crate) fn drop_backend(&self, backend: &str) -> usize {
        let keys = self.devices.keys_where(|k| k.backend == backend);
        for key in &keys {
            self.devices.remove(key);
        }
        keys.len()
    }

    /// Insert or replace one device.
    pub(crate) fn put_device(&self, device: Device) {
        self.devices.upsert(device.key.clone(), device);
    }

    pub(crate) fn mark_refreshed(&self) {
        let _ = self.last_refresh.send_replace(Some(Utc::now()));
    }
}
