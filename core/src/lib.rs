//! In-memory telemetry core for the balloon ground station: normalizes raw
//! frames from the push channel, folds them into bounded track/chart state,
//! and publishes read-only snapshots to whatever renders them.

pub mod config;
pub mod connectivity;
pub mod distance;
pub mod ingest;
pub mod normalize;
pub mod series;
pub mod state;
pub mod track;

pub use config::TrackerConfig;
pub use connectivity::ConnectivityMonitor;
pub use ingest::AppState;
pub use state::TelemetryState;
