//! Telemetry State Store
//!
//! Holds the merged telemetry snapshot, the last network status and the last
//! error string. Reads are synchronous clones of the latest value; every
//! change is also published to subscribers.

use super::snapshot::{MergeReport, NetworkStatus, TelemetrySnapshot};
use gcs_link_shared::{CommandAck, ConnectionState};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};

/// A change published to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Telemetry merged; carries the snapshot after the merge
    Telemetry(TelemetrySnapshot),
    /// Network status replaced
    NetworkStatus(NetworkStatus),
    /// Logical connection state changed
    Connection(ConnectionState),
    /// Advisory command acknowledgment
    CommandAck(CommandAck),
    /// Reply to a network command
    NetworkCommandResult {
        network_id: Option<String>,
        success: bool,
    },
    /// Informational message from the endpoint
    Notice(String),
    /// An error was recorded
    Error(String),
}

/// Process-local store for the live vehicle model
pub struct TelemetryStore {
    telemetry: watch::Sender<TelemetrySnapshot>,
    network: watch::Sender<NetworkStatus>,
    last_error: watch::Sender<Option<String>>,
    changes: broadcast::Sender<StateChange>,
}

impl TelemetryStore {
    /// Create an empty store whose subscribers may lag by up to `capacity` changes
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            telemetry: watch::channel(TelemetrySnapshot::default()).0,
            network: watch::channel(NetworkStatus::default()).0,
            last_error: watch::channel(None).0,
            changes,
        }
    }

    /// Latest merged telemetry
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.borrow().clone()
    }

    /// Last known network status
    pub fn network_status(&self) -> NetworkStatus {
        self.network.borrow().clone()
    }

    /// Most recent error, for diagnostics
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Receive every change from now on.
    ///
    /// A receiver that falls more than `capacity` changes behind gets
    /// `RecvError::Lagged` and should re-read the current values.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Observe only the latest telemetry snapshot
    pub fn watch_telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.telemetry.subscribe()
    }

    /// Observe only the latest network status
    pub fn watch_network_status(&self) -> watch::Receiver<NetworkStatus> {
        self.network.subscribe()
    }

    pub(crate) fn merge_telemetry(&self, data: &Map<String, Value>) -> MergeReport {
        let mut report = MergeReport::default();
        self.telemetry.send_modify(|snapshot| report = snapshot.merge(data));
        self.notify(StateChange::Telemetry(self.telemetry()));
        report
    }

    pub(crate) fn replace_network_status(&self, status: NetworkStatus) {
        self.network.send_replace(status.clone());
        self.notify(StateChange::NetworkStatus(status));
    }

    pub(crate) fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.last_error.send_replace(Some(message.clone()));
        self.notify(StateChange::Error(message));
    }

    pub(crate) fn notify(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(256)
    }
}
