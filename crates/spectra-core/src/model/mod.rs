// ── Canonical domain model ──
//
// Every type in this module is the broker's normalized view of a device,
// independent of which daemon reported it. Consumers (CLI, tests) only
// ever see these.

pub mod device;
pub mod device_key;
pub mod form_factor;

pub use device::{Device, DeviceSummary, ZoneState};
pub use device_key::DeviceKey;
pub use form_factor::{FormFactor, FormFactorKind};
