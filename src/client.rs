//! Telemetry client
//!
//! Ties the link together: one task owns the reconnection supervisor and the
//! message router and reacts to transport events, the retry timer, the
//! keepalive timer and control requests one at a time. Everything else reads
//! the store or sends through the dispatcher.

use crate::command::{CommandDispatcher, DispatchError};
use crate::connection::{ConfigError, ConnectionStats, LinkConfig, LinkStats, ReconnectSupervisor};
use crate::telemetry::{MessageRouter, NetworkStatus, StateChange, TelemetrySnapshot, TelemetryStore};
use crate::transport::{TransportConnector, TransportEvent, WebSocketConnector};
use gcs_link_shared::ConnectionState;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{error, info};

#[derive(Debug)]
enum Control {
    Start,
    Shutdown,
}

/// Handle to a running telemetry link
pub struct TelemetryClient {
    store: Arc<TelemetryStore>,
    stats: Arc<LinkStats>,
    state: watch::Receiver<ConnectionState>,
    dispatcher: CommandDispatcher,
    control: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

impl TelemetryClient {
    /// Build a client over any connector. The link stays disconnected until
    /// [`start`](Self::start). Must be called inside a tokio runtime.
    pub fn create(
        config: LinkConfig,
        connector: Arc<dyn TransportConnector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = Arc::new(TelemetryStore::new(config.subscriber_capacity));
        let stats = Arc::new(LinkStats::new());
        let ping_interval = config.ping_interval;

        let (supervisor, events) =
            ReconnectSupervisor::new(config, connector, store.clone(), stats.clone());
        let state = supervisor.watch_state();
        let dispatcher =
            CommandDispatcher::new(state.clone(), supervisor.watch_link(), stats.clone());
        let router = MessageRouter::new(store.clone(), stats.clone());

        let (control, control_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_link(
            supervisor,
            events,
            router,
            control_rx,
            ping_interval,
        ));

        Ok(Self {
            store,
            stats,
            state,
            dispatcher,
            control,
            task,
        })
    }

    /// Build a WebSocket client and start connecting
    pub fn connect(config: LinkConfig) -> Result<Self, ConfigError> {
        let connector = Arc::new(WebSocketConnector::new(config.connect_timeout));
        let client = Self::create(config, connector)?;
        client.start();
        Ok(client)
    }

    /// Bring the link up. Safe to call repeatedly.
    pub fn start(&self) {
        let _ = self.control.send(Control::Start);
    }

    /// Cancel any pending reconnect, close the connection and wait for the
    /// link task to finish
    pub async fn shutdown(self) {
        let _ = self.control.send(Control::Shutdown);
        if let Err(e) = self.task.await {
            error!("[LINK] Link task failed: {}", e);
        }
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.store.telemetry()
    }

    pub fn network_status(&self) -> NetworkStatus {
        self.store.network_status()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn watch_telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.store.watch_telemetry()
    }

    pub fn watch_network_status(&self) -> watch::Receiver<NetworkStatus> {
        self.store.watch_network_status()
    }

    /// Most recent transport, parse or endpoint error
    pub fn last_error(&self) -> Option<String> {
        self.store.last_error()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.store.subscribe()
    }

    /// A cloneable dispatcher for handing to other tasks
    pub fn dispatcher(&self) -> CommandDispatcher {
        self.dispatcher.clone()
    }

    pub fn dispatch(&self, command: &str, params: Map<String, Value>) -> bool {
        self.dispatcher.dispatch(command, params)
    }

    pub fn try_dispatch(
        &self,
        command: &str,
        params: Map<String, Value>,
    ) -> Result<u64, DispatchError> {
        self.dispatcher.try_dispatch(command, params)
    }

    pub fn dispatch_network_command(&self, network_id: &str) -> bool {
        self.dispatcher.dispatch_network_command(network_id)
    }

    pub fn request_network_status(&self) -> bool {
        self.dispatcher.request_network_status()
    }
}

async fn run_link(
    mut supervisor: ReconnectSupervisor,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    router: MessageRouter,
    mut control: mpsc::UnboundedReceiver<Control>,
    ping_interval: Option<Duration>,
) {
    let mut keepalive = ping_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let retry_at = supervisor.retry_deadline();

        tokio::select! {
            request = control.recv() => match request {
                Some(Control::Start) => supervisor.start(),
                Some(Control::Shutdown) | None => {
                    supervisor.shutdown();
                    break;
                }
            },
            Some(event) = events.recv() => {
                if let Some(text) = supervisor.handle_event(event) {
                    router.route(&text);
                }
            }
            _ = sleep_until(retry_at) => supervisor.retry_due(),
            _ = tick(&mut keepalive) => {
                supervisor.send_keepalive();
            }
        }
    }

    info!("[LINK] Link task stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
