//! Live vehicle model: telemetry snapshot, network status and the router
//! that feeds them from inbound envelopes.

mod router;
mod snapshot;
mod store;

pub use router::{MessageRouter, RouteOutcome};
pub use snapshot::{fields, FieldValue, MergeReport, NetworkStatus, SignalTier, TelemetrySnapshot};
pub use store::{StateChange, TelemetryStore};
