//! Events delivered by the link stack

use crate::types::{AttributeHandle, BdAddr, BondingHandle, ConnectionId};

// ----------------------------------------------------------------------------
// Link Events
// ----------------------------------------------------------------------------

/// One asynchronous event from the link stack
///
/// Events are delivered one at a time, never concurrently with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The stack finished booting and accepts commands
    SystemBoot,
    /// A central connected to us
    ConnectionOpened {
        connection: ConnectionId,
        bonding: BondingHandle,
        address: BdAddr,
    },
    /// A connection went away
    ConnectionClosed { connection: ConnectionId, reason: u16 },
    /// A peer wrote a value to a local attribute
    AttributeValue {
        attribute: AttributeHandle,
        payload: Vec<u8>,
    },
    /// Any event category the transport does not handle
    Other { id: u32 },
}

impl LinkEvent {
    /// Category name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            LinkEvent::SystemBoot => "SystemBoot",
            LinkEvent::ConnectionOpened { .. } => "ConnectionOpened",
            LinkEvent::ConnectionClosed { .. } => "ConnectionClosed",
            LinkEvent::AttributeValue { .. } => "AttributeValue",
            LinkEvent::Other { .. } => "Other",
        }
    }
}
