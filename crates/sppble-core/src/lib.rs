//! Core types for the BLE serial-port transport
//!
//! This crate holds everything the transport needs that is independent of
//! locking, logging and the concrete Bluetooth stack:
//!
//! - [`types`] - opaque link-stack handles and the Bluetooth device address
//! - [`event`] - the asynchronous events a link stack delivers
//! - [`link`] - the [`LinkStack`] capability trait the transport drives
//! - [`queue`] - the fixed-capacity circular [`ByteQueue`]
//! - [`registry`] - the bounded [`ConnectionRegistry`]
//! - [`config`] - transport and advertising configuration
//! - [`protocol`] - service/characteristic identifiers and size constants
//! - [`errors`] - the error taxonomy shared by every crate in the workspace

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod event;
pub mod link;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{AdvertisingConfig, ConnectionMode, DiscoveryMode, LogConfig, SppConfig};
pub use errors::{LinkError, Result, SppError};
pub use event::LinkEvent;
pub use link::{
    AttributeUuid, CharacteristicProperties, CharacteristicSpec, LinkStack, NotifyTarget,
    ServiceSpec,
};
pub use queue::ByteQueue;
pub use registry::{ConnectionRecord, ConnectionRegistry};
pub use types::{
    AddressType, AdvertisingSetHandle, AttributeHandle, BdAddr, BondingHandle, ConnectionId,
    GattSessionId,
};
