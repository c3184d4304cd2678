//! Builders for link events the transport consumes

use sppble_core::{AttributeHandle, BdAddr, BondingHandle, ConnectionId, LinkEvent};

/// Remote-user-terminated-connection, the usual disconnect reason
pub const REASON_REMOTE_USER_TERMINATED: u16 = 0x0213;

pub fn boot() -> LinkEvent {
    LinkEvent::SystemBoot
}

/// A central with a predictable address built from its connection handle
pub fn connection_opened(connection: u8) -> LinkEvent {
    LinkEvent::ConnectionOpened {
        connection: ConnectionId(connection),
        bonding: BondingHandle::NONE,
        address: BdAddr::new([connection, 0x00, 0x00, 0x00, 0x42, 0xC0]),
    }
}

pub fn connection_closed(connection: u8) -> LinkEvent {
    LinkEvent::ConnectionClosed {
        connection: ConnectionId(connection),
        reason: REASON_REMOTE_USER_TERMINATED,
    }
}

pub fn attribute_write(attribute: AttributeHandle, payload: &[u8]) -> LinkEvent {
    LinkEvent::AttributeValue {
        attribute,
        payload: payload.to_vec(),
    }
}
