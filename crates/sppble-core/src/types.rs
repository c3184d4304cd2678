//! Opaque link-stack handles and addressing types
//!
//! The link stack owns all of its own memory; the transport only ever refers to
//! stack objects through these small copyable handles.

use core::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Handles
// ----------------------------------------------------------------------------

/// Link-layer connection handle assigned by the stack on connection-opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u8);

impl ConnectionId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Reference to a peer's stored security association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BondingHandle(pub u8);

impl BondingHandle {
    /// The stack reports this value for peers without a bond
    pub const NONE: BondingHandle = BondingHandle(0xFF);

    pub const fn is_bonded(self) -> bool {
        self.0 != Self::NONE.0
    }
}

impl fmt::Display for BondingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Handle of a GATT service or characteristic in the local database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeHandle(pub u16);

impl fmt::Display for AttributeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Handle of an advertising set owned by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvertisingSetHandle(pub u8);

/// Handle of an open GATT database editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GattSessionId(pub u16);

impl fmt::Display for GattSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Bluetooth Device Address
// ----------------------------------------------------------------------------

/// Kind of identity address reported by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    Public,
    StaticRandom,
}

/// 48-bit Bluetooth device address, stored least-significant byte first as
/// the link stack reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Short identifier built from the three least-significant bytes, most
    /// significant first, e.g. `"0c1d2e"` for `..:2E:1D:0C`
    pub fn short_id(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.0[2], self.0[1], self.0[0])
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[5], a[4], a[3], a[2], a[1], a[0]
        )
    }
}
