// ── Broker facade ──
//
// The single entry point consumers hold. Owns the registry, catalog,
// dispatcher and matrix controller; cheaply cloneable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use spectra_backend::Backend;
use tracing::info;

use crate::batch::BatchReport;
use crate::catalog::{DeviceCatalog, RefreshReport};
use crate::config::BrokerConfig;
use crate::dispatcher::EffectDispatcher;
use crate::error::CoreError;
use crate::matrix::{MatrixController, MatrixHandle};
use crate::model::{Device, DeviceSummary};
use crate::registry::{Availability, BackendHandle, BackendRegistry};
use crate::request::SetStateRequest;
use crate::stream::DeviceStream;

/// The lighting broker.
///
/// Clone it freely; every clone shares the same cache and backends.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    catalog: Arc<DeviceCatalog>,
    dispatcher: EffectDispatcher,
    matrix: MatrixController,
}

impl Broker {
    /// Build every configured backend and an empty cache.
    ///
    /// Never fails: backends that cannot be constructed are registered as
    /// [`Availability::Failed`].
    pub async fn init(config: &BrokerConfig) -> Self {
        let registry = BackendRegistry::init(config).await;
        Self::with_registry(registry)
    }

    /// Build around pre-constructed adapters, using `config` for timeouts only.
    pub fn from_adapters(adapters: Vec<Arc<dyn Backend>>, config: &BrokerConfig) -> Self {
        let registry =
            BackendRegistry::from_adapters(adapters, config.call_timeout, config.probe_timeout);
        Self::with_registry(registry)
    }

    fn with_registry(registry: BackendRegistry) -> Self {
        info!(backends = ?registry.list_backends(), "broker ready");
        let catalog = Arc::new(DeviceCatalog::new(registry));
        Self {
            inner: Arc::new(BrokerInner {
                dispatcher: EffectDispatcher::new(Arc::clone(&catalog)),
                matrix: MatrixController::new(Arc::clone(&catalog)),
                catalog,
            }),
        }
    }

    // ── Backends ─────────────────────────────────────────────────────

    pub fn list_backends(&self) -> Vec<String> {
        self.inner.catalog.registry().list_backends()
    }

    pub fn get_backend(&self, id: &str) -> Option<BackendHandle> {
        self.inner.catalog.registry().get_backend(id)
    }

    /// Cached availability of `id`, probing on first use. `false` for unknown ids.
    pub async fn is_available(&self, id: &str) -> bool {
        match self.get_backend(id) {
            Some(handle) => handle.is_available().await,
            None => false,
        }
    }

    /// Re-probe one backend. `None` for unknown ids.
    pub async fn probe(&self, id: &str) -> Option<Availability> {
        Some(self.get_backend(id)?.probe().await)
    }

    // ── Catalog ──────────────────────────────────────────────────────

    pub async fn refresh(&self) -> RefreshReport {
        self.inner.catalog.refresh().await
    }

    pub async fn device_list(&self) -> Vec<DeviceSummary> {
        self.inner.catalog.device_list().await
    }

    pub async fn filtered_device_list(&self, form_factor: &str) -> Vec<DeviceSummary> {
        self.inner.catalog.filtered_device_list(form_factor).await
    }

    pub async fn get_device(&self, backend: &str, uid: &str) -> Option<Arc<Device>> {
        self.inner.catalog.get_device(backend, uid).await
    }

    pub async fn device_all(&self) -> Vec<Arc<Device>> {
        self.inner.catalog.device_all().await
    }

    /// Subscribe to cache snapshots.
    pub fn devices(&self) -> DeviceStream {
        self.inner.catalog.subscribe()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.catalog.store().last_refresh()
    }

    // ── Effects ──────────────────────────────────────────────────────

    pub async fn set_device_state(&self, request: SetStateRequest) -> Result<(), CoreError> {
        self.inner.dispatcher.set_device_state(request).await
    }

    pub async fn set_many(&self, requests: Vec<SetStateRequest>) -> BatchReport {
        self.inner.dispatcher.set_many(requests).await
    }

    // ── Matrix ───────────────────────────────────────────────────────

    pub async fn get_device_object(
        &self,
        backend: &str,
        uid: &str,
    ) -> Result<Option<MatrixHandle>, CoreError> {
        self.inner.matrix.get_device_object(backend, uid).await
    }

    pub async fn fan_out<F>(&self, paint: F) -> BatchReport
    where
        F: Fn(&mut MatrixHandle) + Sync,
    {
        self.inner.matrix.fan_out(paint).await
    }
}
