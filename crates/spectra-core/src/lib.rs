// spectra-core: Middleman layer between lighting daemons and consumers (CLI).

pub mod batch;
pub mod broker;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod matrix;
pub mod model;
pub mod registry;
pub mod request;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use batch::{BatchFailure, BatchReport};
pub use broker::Broker;
pub use catalog::{DeviceCatalog, RefreshReport};
pub use config::{BackendConfig, BackendKind, BrokerConfig};
pub use dispatcher::EffectDispatcher;
pub use error::CoreError;
pub use matrix::{MatrixController, MatrixHandle};
pub use registry::{Availability, BackendHandle, BackendRegistry};
pub use request::SetStateRequest;
pub use store::DeviceStore;
pub use stream::{DeviceFilter, DeviceStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{Device, DeviceKey, DeviceSummary, FormFactor, ZoneState};

// Wire types consumers need without depending on the backend crate.
pub use spectra_backend::{
    ColourCount, EffectDescriptor, MatrixDimensions, ParameterKind, ParameterOption,
    ParameterValue, Rgb,
};
