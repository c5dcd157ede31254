// ── Device domain types ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spectra_backend::{EffectDescriptor, MatrixDimensions, ParameterValue, Rgb};

use super::device_key::DeviceKey;
use super::form_factor::FormFactor;

/// Current lighting state of one zone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub effect: Option<String>,
    pub parameter: Option<ParameterValue>,
    pub colours: Vec<Rgb>,
    /// Percentage, 0-100.
    pub brightness: Option<u8>,
}

/// Canonical device summary, as handed to listing consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub uid: String,
    pub name: String,
    pub backend: String,
    pub serial: Option<String>,
    pub form_factor: FormFactor,
    pub zones: Vec<String>,
    pub has_matrix: bool,
}

impl DeviceSummary {
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(&self.backend, &self.uid)
    }
}

/// Full canonical device descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(flatten)]
    pub key: DeviceKey,
    pub name: String,
    pub serial: Option<String>,
    pub form_factor: FormFactor,
    /// Backend-supplied icon, else the form factor's.
    pub icon: String,
    /// Zone id -> display label, in backend order.
    pub zones: IndexMap<String, String>,
    /// Zone id -> effects that zone accepts.
    pub capabilities: IndexMap<String, Vec<EffectDescriptor>>,
    /// Zone id -> last known state.
    pub state: IndexMap<String, ZoneState>,
    /// Only present for keyboards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard_layout: Option<String>,
    pub matrix: Option<MatrixDimensions>,
    pub firmware: Option<String>,
}

impl Device {
    pub fn has_matrix(&self) -> bool {
        self.matrix.is_some()
    }

    pub fn has_zone(&self, zone: &str) -> bool {
        self.capabilities.contains_key(zone)
    }

    /// The descriptor of `effect` in `zone`, if the zone offers it.
    pub fn effect(&self, zone: &str, effect: &str) -> Option<&EffectDescriptor> {
        self.capabilities.get(zone)?.iter().find(|e| e.id == effect)
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            uid: self.key.uid.clone(),
            name: self.name.clone(),
            backend: self.key.backend.clone(),
            serial: self.serial.clone(),
            form_factor: self.form_factor.clone(),
            zones: self.zones.keys().cloned().collect(),
            has_matrix: self.has_matrix(),
        }
    }
}
