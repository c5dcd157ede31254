// ── State-change requests ──

use serde::{Deserialize, Serialize};
use spectra_backend::ParameterValue;

use crate::model::DeviceKey;

/// A consumer's request to change one zone of one device.
///
/// Colours arrive as raw strings and are validated by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStateRequest {
    pub backend: String,
    pub uid: String,
    /// When present, must match the cached serial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    pub zone: String,
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<ParameterValue>,
    #[serde(default)]
    pub colours: Vec<String>,
}

impl SetStateRequest {
    pub fn new(
        backend: impl Into<String>,
        uid: impl Into<String>,
        zone: impl Into<String>,
        effect: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            uid: uid.into(),
            serial: None,
            zone: zone.into(),
            effect: effect.into(),
            parameter: None,
            colours: Vec::new(),
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterValue) -> Self {
        self.parameter = Some(parameter);
        self
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colours.push(colour.into());
        self
    }

    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(&self.backend, &self.uid)
    }
}
