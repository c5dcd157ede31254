// spectra-backend: plugin contract and adapters for RGB lighting daemons

pub mod effects;
pub mod error;
pub mod http;
pub mod memory;
#[cfg(feature = "openrazer")]
pub mod openrazer;
pub mod timed;
pub mod transport;
pub mod types;

use async_trait::async_trait;

pub use error::Error;
pub use http::HttpBackend;
pub use memory::MemoryBackend;
#[cfg(feature = "openrazer")]
pub use openrazer::OpenRazerBackend;
pub use timed::TimedBackend;
pub use transport::TransportConfig;
pub use types::{
    BRIGHTNESS_EFFECT, ColourCount, EffectDescriptor, Frame, MAX_MATRIX_PIXELS, MatrixDimensions,
    ParameterKind, ParameterOption, ParameterValue, RawDeviceDescriptor, RawZone, RawZoneState,
    Rgb, StateChange,
};

/// The contract every lighting daemon adapter satisfies.
///
/// Adapters are thin: they translate between the daemon's native protocol
/// and the loosely-typed descriptors in [`types`]. Normalization, validation
/// and caching all happen above this layer.
///
/// Every method returns a typed [`Error`]; adapters must never let a raw
/// transport error (HTTP, D-Bus) escape.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable identifier of this backend instance (its configuration key).
    fn id(&self) -> &str;

    /// Lightweight liveness check. Must not touch any device.
    async fn probe(&self) -> Result<(), Error>;

    /// Enumerate every device the daemon currently knows about.
    async fn discover(&self) -> Result<Vec<RawDeviceDescriptor>, Error>;

    /// Fetch one device descriptor by uid.
    async fn get_device(&self, uid: &str) -> Result<RawDeviceDescriptor, Error>;

    /// Apply an effect or brightness change to one zone of a device.
    async fn set_state(&self, uid: &str, change: &StateChange) -> Result<(), Error>;

    /// Report the LED matrix dimensions of a device.
    async fn get_matrix(&self, uid: &str) -> Result<MatrixDimensions, Error>;

    /// Flush a complete frame to the device in a single transaction.
    async fn draw_matrix(&self, uid: &str, frame: &Frame) -> Result<(), Error>;

    /// Whether the daemon tolerates overlapping requests.
    fn supports_concurrent_requests(&self) -> bool {
        true
    }
}
