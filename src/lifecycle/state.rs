//! Server lifecycle state.
//!
//! # Responsibilities
//! - Enumerate the lifecycle states a server unit passes through
//! - Share the current state between the host thread and the reactor
//!
//! # Design Decisions
//! - Stored as an `AtomicU8` so the reactor can poll it on every wakeup
//! - Only `Starting` and `Started` keep the reactor loop running

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the HTTP server unit.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerState {
    Uninitialized = 0,
    Initialized = 1,
    Starting = 2,
    Started = 3,
    Stopping = 4,
    Stopped = 5,
    ShuttingDown = 6,
    Shutdown = 7,
}

impl ServerState {
    /// Returns true for the states in which the reactor keeps polling.
    pub fn is_active(self) -> bool {
        matches!(self, ServerState::Starting | ServerState::Started)
    }
}

impl From<u8> for ServerState {
    fn from(val: u8) -> Self {
        match val {
            1 => ServerState::Initialized,
            2 => ServerState::Starting,
            3 => ServerState::Started,
            4 => ServerState::Stopping,
            5 => ServerState::Stopped,
            6 => ServerState::ShuttingDown,
            7 => ServerState::Shutdown,
            _ => ServerState::Uninitialized,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Uninitialized => "UNINITIALIZED",
            ServerState::Initialized => "INITIALIZED",
            ServerState::Starting => "STARTING",
            ServerState::Started => "STARTED",
            ServerState::Stopping => "STOPPING",
            ServerState::Stopped => "STOPPED",
            ServerState::ShuttingDown => "SHUTTING_DOWN",
            ServerState::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

/// Shared, lock-free holder of a [`ServerState`].
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub fn new(state: ServerState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    pub fn get(&self) -> ServerState {
        ServerState::from(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ServerState) {
        let previous = ServerState::from(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Server state changed");
        }
    }

    /// Move to `to` only if the current state is `from`.
    pub fn transition(&self, from: ServerState, to: ServerState) -> bool {
        let swapped = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if swapped {
            tracing::debug!(from = %from, to = %to, "Server state changed");
        }
        swapped
    }

    pub fn is_active(&self) -> bool {
        self.get().is_active()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(ServerState::Uninitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_starting_and_started_are_active() {
        let active: Vec<_> = (0u8..8)
            .map(ServerState::from)
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(active, vec![ServerState::Starting, ServerState::Started]);
    }

    #[test]
    fn state_cell_round_trips_every_state() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), ServerState::Uninitialized);
        for raw in 0u8..8 {
            let state = ServerState::from(raw);
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn transition_requires_expected_state() {
        let cell = StateCell::new(ServerState::Stopped);
        assert!(!cell.transition(ServerState::Starting, ServerState::Started));
        assert_eq!(cell.get(), ServerState::Stopped);

        cell.set(ServerState::Starting);
        assert!(cell.transition(ServerState::Starting, ServerState::Started));
        assert_eq!(cell.get(), ServerState::Started);
    }
}
