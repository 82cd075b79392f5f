//! Link State Machine
//!
//! Defines the logical connection states of the telemetry link and the
//! transitions driven by transport lifecycle events and the reconnect timer.
//! The machine is pure: it decides, the supervisor acts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical connection status exposed to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport, or waiting for the reconnect delay
    #[default]
    Disconnected,
    /// Transport is being established
    Connecting,
    /// Transport is open
    Connected,
    /// Last transport ended with an error; a reconnect is scheduled
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Operator asked the link to come up
    Start,
    /// Transport reported open
    Opened,
    /// Transport closed cleanly (or the peer went away)
    Closed { code: Option<u16> },
    /// Transport failed
    Failed { reason: String },
    /// Reconnect delay elapsed
    RetryDue,
    /// Subsystem shutdown
    Shutdown,
}

/// What the supervisor must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Nothing beyond publishing the new state
    None,
    /// Create a new transport connection
    OpenTransport,
    /// Arm the fixed reconnect timer
    ScheduleReconnect,
    /// Cancel the timer and close the active transport
    CloseTransport,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// Transition was valid
    Success {
        from: ConnectionState,
        to: ConnectionState,
        action: LinkAction,
    },
    /// Event has no effect in the current state
    Ignored {
        from: ConnectionState,
        event: LinkEvent,
    },
}

impl TransitionResult {
    /// Action to perform, `LinkAction::None` when ignored
    #[cfg(test)]
    pub fn action(&self) -> LinkAction {
        match self {
            TransitionResult::Success { action, .. } => *action,
            TransitionResult::Ignored { .. } => LinkAction::None,
        }
    }
}

/// The connection state machine of the reconnection supervisor
#[derive(Debug, Default)]
pub struct LinkStateMachine {
    current_state: ConnectionState,
    reconnect_pending: bool,
    stopped: bool,
}

impl LinkStateMachine {
    /// Create a new state machine in Disconnected state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.current_state
    }

    /// Whether a reconnect timer is armed
    #[cfg(test)]
    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Whether shutdown has been processed
    #[cfg(test)]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: LinkEvent) -> TransitionResult {
        let from = self.current_state;

        if self.stopped {
            return TransitionResult::Ignored { from, event };
        }

        if event == LinkEvent::Shutdown {
            self.stopped = true;
            self.reconnect_pending = false;
            self.current_state = ConnectionState::Disconnected;
            return TransitionResult::Success {
                from,
                to: ConnectionState::Disconnected,
                action: LinkAction::CloseTransport,
            };
        }

        match self.next(&event) {
            Some((to, action)) => {
                self.current_state = to;
                self.reconnect_pending = action == LinkAction::ScheduleReconnect;
                TransitionResult::Success { from, to, action }
            }
            None => TransitionResult::Ignored { from, event },
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn next(&self, event: &LinkEvent) -> Option<(ConnectionState, LinkAction)> {
        use ConnectionState::*;
        use LinkEvent::*;

        match (self.current_state, event) {
            // Idle, or waiting out the reconnect delay; Start skips the wait
            (Disconnected | Error, Start) => Some((Connecting, LinkAction::OpenTransport)),
            (Disconnected | Error, RetryDue) if self.reconnect_pending => {
                Some((Connecting, LinkAction::OpenTransport))
            }

            (Connecting, Opened) => Some((Connected, LinkAction::None)),

            // A failed attempt is handled exactly like a lost connection
            (Connecting | Connected, Closed { .. }) => {
                Some((Disconnected, LinkAction::ScheduleReconnect))
            }
            (Connecting | Connected, Failed { .. }) => Some((Error, LinkAction::ScheduleReconnect)),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(result: &TransitionResult) -> (ConnectionState, LinkAction) {
        match result {
            TransitionResult::Success { to, action, .. } => (*to, *action),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_initial_state() {
        let fsm = LinkStateMachine::new();
        assert_eq!(fsm.state(), ConnectionState::Disconnected);
        assert!(!fsm.is_reconnect_pending());
    }

    #[test]
    fn test_connect_and_reconnect_cycle() {
        let mut fsm = LinkStateMachine::new();

        let result = fsm.process_event(LinkEvent::Start);
        assert_eq!(success(&result), (ConnectionState::Connecting, LinkAction::OpenTransport));

        let result = fsm.process_event(LinkEvent::Opened);
        assert_eq!(success(&result), (ConnectionState::Connected, LinkAction::None));

        let result = fsm.process_event(LinkEvent::Closed { code: Some(1006) });
        assert_eq!(
            success(&result),
            (ConnectionState::Disconnected, LinkAction::ScheduleReconnect)
        );
        assert!(fsm.is_reconnect_pending());

        let result = fsm.process_event(LinkEvent::RetryDue);
        assert_eq!(success(&result), (ConnectionState::Connecting, LinkAction::OpenTransport));
        assert!(!fsm.is_reconnect_pending());
    }

    #[test]
    fn test_error_is_distinct_from_clean_close() {
        let mut fsm = LinkStateMachine::new();
        fsm.process_event(LinkEvent::Start);
        fsm.process_event(LinkEvent::Opened);

        let result = fsm.process_event(LinkEvent::Failed {
            reason: "connection reset".into(),
        });
        assert_eq!(success(&result), (ConnectionState::Error, LinkAction::ScheduleReconnect));
    }

    #[test]
    fn test_failed_attempt_schedules_reconnect() {
        let mut fsm = LinkStateMachine::new();
        fsm.process_event(LinkEvent::Start);

        let result = fsm.process_event(LinkEvent::Failed {
            reason: "connection refused".into(),
        });
        assert_eq!(success(&result), (ConnectionState::Error, LinkAction::ScheduleReconnect));

        let result = fsm.process_event(LinkEvent::RetryDue);
        assert_eq!(success(&result), (ConnectionState::Connecting, LinkAction::OpenTransport));
    }

    #[test]
    fn test_start_is_noop_while_active() {
        let mut fsm = LinkStateMachine::new();
        fsm.process_event(LinkEvent::Start);

        assert!(matches!(
            fsm.process_event(LinkEvent::Start),
            TransitionResult::Ignored { .. }
        ));

        fsm.process_event(LinkEvent::Opened);
        assert!(matches!(
            fsm.process_event(LinkEvent::Start),
            TransitionResult::Ignored { .. }
        ));
        assert_eq!(fsm.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_retry_without_pending_timer_is_ignored() {
        let mut fsm = LinkStateMachine::new();
        let result = fsm.process_event(LinkEvent::RetryDue);
        assert_eq!(result.action(), LinkAction::None);
        assert_eq!(fsm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_start_during_reconnect_delay_cancels_timer() {
        let mut fsm = LinkStateMachine::new();
        fsm.process_event(LinkEvent::Start);
        fsm.process_event(LinkEvent::Closed { code: None });
        assert!(fsm.is_reconnect_pending());

        let result = fsm.process_event(LinkEvent::Start);
        assert_eq!(success(&result), (ConnectionState::Connecting, LinkAction::OpenTransport));
        assert!(!fsm.is_reconnect_pending());

        // The old timer firing late must not open a second transport
        assert_eq!(fsm.process_event(LinkEvent::RetryDue).action(), LinkAction::None);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut fsm = LinkStateMachine::new();
        fsm.process_event(LinkEvent::Start);
        fsm.process_event(LinkEvent::Opened);

        let result = fsm.process_event(LinkEvent::Shutdown);
        assert_eq!(
            success(&result),
            (ConnectionState::Disconnected, LinkAction::CloseTransport)
        );
        assert!(fsm.is_stopped());

        for event in [LinkEvent::Start, LinkEvent::RetryDue, LinkEvent::Opened] {
            assert!(matches!(fsm.process_event(event), TransitionResult::Ignored { .. }));
        }
        assert_eq!(fsm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_open_without_connecting_is_ignored() {
        let mut fsm = LinkStateMachine::new();
        assert!(matches!(
            fsm.process_event(LinkEvent::Opened),
            TransitionResult::Ignored { .. }
        ));
    }

    #[test]
    fn test_state_display_matches_wire_names() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Error).unwrap(),
            "\"error\""
        );
    }
}
