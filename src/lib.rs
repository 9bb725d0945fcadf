//! Simulated soil-sensor telemetry for the dots dashboard.
//!
//! The crate is organised around two collaborating pieces sharing one
//! in-memory [`Store`]:
//! - [`Simulator`]: timer-driven generator of readings, KPI snapshots,
//!   alerts and recommendations (sole writer of telemetry)
//! - [`DataApi`]: async facade with simulated latency over the store (sole
//!   writer of fields and thresholds), mirrored over HTTP by [`routes`]
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): sibling modules import
//! shared types from the crate root, never from each other's internals.

pub mod api;
pub mod config;
pub mod error;
pub mod latency;
pub mod models;
pub mod routes;
pub mod simulator;
pub mod store;

pub use api::DataApi;
pub use config::Config;
pub use error::StoreError;
pub use latency::Latency;
pub use models::{
    Action, Alert, Crop, Field, FieldPatch, Kpis, NewField, Reading, ReadingsFilter,
    Recommendation, Sensor, SensorKind, SensorStatus, Severity, Thresholds, ThresholdsPatch,
    Units,
};
pub use simulator::{SimSettings, Simulator};
pub use store::{SharedStore, Store};
