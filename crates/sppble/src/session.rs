//! Session State Machine
//!
//! Tracks the link lifecycle that gates the stream. Transitions are pure:
//! they consume the current state and an event and produce the next state
//! plus the advertising effects the transport must execute.
//!
//! ```text
//! NotStarted --start--> AwaitingStackBoot --boot--> Idle <--> Active
//!      ^                                                       |
//!      +-------------------------- end ------------------------+
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ----------------------------------------------------------------------------
// States, Events, Effects
// ----------------------------------------------------------------------------

/// Lifecycle of the serial-port session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Initial state; only `start` moves out of it
    #[default]
    NotStarted,
    /// Started before the link stack signalled readiness
    AwaitingStackBoot,
    /// Advertising, no peers connected
    Idle,
    /// At least one peer connected
    Active,
}

/// Inputs to the session machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// `start` was called; `stack_booted` reports whether the stack is ready
    Start { stack_booted: bool },
    /// The link stack signalled readiness
    StackBooted,
    /// A connection was registered; `connections` is the registry size after it
    ConnectionOpened { connections: usize, capacity: usize },
    /// A connection was removed; `connections` is the registry size after it
    ConnectionClosed { connections: usize, capacity: usize },
    /// Teardown finished
    Ended,
}

/// Side effects the transport carries out after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Recreate the advertising set with the current parameters
    ConfigureAdvertising,
    /// Start (or restart) legacy advertising
    StartAdvertising,
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub effects: SmallVec<[SessionEffect; 2]>,
    /// `to` mirrors the connection registry and holds even if an effect fails
    pub commit_before_effects: bool,
}

impl SessionTransition {
    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.effects.is_empty()
    }
}

// ----------------------------------------------------------------------------
// State Machine Implementation
// ----------------------------------------------------------------------------

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "NotStarted",
            SessionState::AwaitingStackBoot => "AwaitingStackBoot",
            SessionState::Idle => "Idle",
            SessionState::Active => "Active",
        }
    }

    /// Whether `start` has run and `end` has not
    pub fn is_started(&self) -> bool {
        !matches!(self, SessionState::NotStarted)
    }

    /// Process an event and transition to the new state (consumes self)
    pub fn transition(self, event: SessionEvent) -> SessionTransition {
        use SessionEffect::*;
        use SessionState::*;

        let mut effects = SmallVec::new();

        let to = match (self, event) {
            (NotStarted, SessionEvent::Start { stack_booted: true }) => {
                effects.push(ConfigureAdvertising);
                effects.push(StartAdvertising);
                Idle
            }
            (NotStarted, SessionEvent::Start { stack_booted: false }) => AwaitingStackBoot,
            // start is idempotent once the session is running
            (state, SessionEvent::Start { .. }) => state,

            (AwaitingStackBoot, SessionEvent::StackBooted) => {
                effects.push(ConfigureAdvertising);
                effects.push(StartAdvertising);
                Idle
            }
            (state, SessionEvent::StackBooted) => state,

            (
                Idle | Active,
                SessionEvent::ConnectionOpened {
                    connections,
                    capacity,
                },
            ) => {
                if connections < capacity {
                    effects.push(StartAdvertising);
                }
                Active
            }
            (state, SessionEvent::ConnectionOpened { .. }) => state,

            (
                Idle | Active,
                SessionEvent::ConnectionClosed {
                    connections,
                    capacity,
                },
            ) => {
                if connections == 0 {
                    Idle
                } else {
                    if connections < capacity {
                        effects.push(StartAdvertising);
                    }
                    Active
                }
            }
            (state, SessionEvent::ConnectionClosed { .. }) => state,

            (_, SessionEvent::Ended) => NotStarted,
        };

        SessionTransition {
            from: self,
            to,
            effects,
            commit_before_effects: matches!(
                event,
                SessionEvent::ConnectionOpened { .. } | SessionEvent::ConnectionClosed { .. }
            ),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
