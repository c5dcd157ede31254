// ── Filter predicates for device streams ──

use crate::model::{Device, FormFactorKind};

/// Filter predicate for device snapshots.
pub enum DeviceFilter {
    All,
    ByFormFactor(FormFactorKind),
    ByBackend(String),
    WithMatrix,
    Custom(Box<dyn Fn(&Device) -> bool + Send + Sync>),
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            Self::All => true,
            Self::ByFormFactor(kind) => device.form_factor.kind() == *kind,
            Self::ByBackend(backend) => device.key.backend == *backend,
            Self::WithMatrix => device.has_matrix(),
            Self::Custom(f) => f(device),
        }
    }
}
