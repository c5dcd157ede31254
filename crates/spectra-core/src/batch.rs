// ── Batch outcomes ──

use serde::Serialize;

use crate::error::CoreError;
use crate::model::DeviceKey;

/// One device that failed within a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub device: DeviceKey,
    pub error: CoreError,
}

/// Per-device outcome of a multi-device operation.
///
/// A failure on one device never aborts the others.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<DeviceKey>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub(crate) fn record(&mut self, device: DeviceKey, outcome: Result<(), CoreError>) {
        match outcome {
            Ok(()) => self.succeeded.push(device),
            Err(error) => self.failed.push(BatchFailure { device, error }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// The error recorded for `device`, if it failed.
    pub fn failure(&self, device: &DeviceKey) -> Option<&CoreError> {
        self.failed
            .iter()
            .find(|f| f.device == *device)
            .map(|f| &f.error)
    }
}

// Errors are flattened to their message for output.
#[derive(Serialize)]
struct FailureRow<'a> {
    device: &'a DeviceKey,
    error: String,
}

impl Serialize for BatchReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let failed: Vec<FailureRow<'_>> = self
            .failed
            .iter()
            .map(|f| FailureRow {
                device: &f.device,
                error: f.error.to_string(),
            })
            .collect();

        let mut s = serializer.serialize_struct("BatchReport", 2)?;
        s.serialize_field("succeeded", &self.succeeded)?;
        s.serialize_field("failed", &failed)?;
        s.end()
    }
}
