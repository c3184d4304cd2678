//! Link-stack capability boundary
//!
//! The transport never owns the Bluetooth stack. It drives it exclusively
//! through [`LinkStack`], which an embedder implements on top of the vendor
//! API (or a fake, for tests). All references across the boundary are opaque
//! handles.

use uuid::Uuid;

use crate::config::{AdvertisingConfig, ConnectionMode, DiscoveryMode};
use crate::errors::LinkError;
use crate::protocol::NOTIFY_ALL_CONNECTIONS;
use crate::types::{
    AddressType, AdvertisingSetHandle, AttributeHandle, BdAddr, ConnectionId, GattSessionId,
};

// ----------------------------------------------------------------------------
// GATT Database Descriptions
// ----------------------------------------------------------------------------

/// Attribute type identifier, either a 16-bit SIG alias or a full 128-bit UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeUuid {
    Short(u16),
    Long(Uuid),
}

/// Characteristic access properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
}

impl CharacteristicProperties {
    pub const READ: Self = Self {
        read: true,
        write: false,
        write_without_response: false,
        notify: false,
    };

    pub const WRITE_NO_RESPONSE_NOTIFY: Self = Self {
        read: false,
        write: false,
        write_without_response: true,
        notify: true,
    };
}

/// Service to add to a GATT database session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub uuid: AttributeUuid,
    pub primary: bool,
    /// Include the service UUID in advertising data
    pub advertised: bool,
}

/// Characteristic to add to a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicSpec {
    pub uuid: AttributeUuid,
    pub properties: CharacteristicProperties,
    pub fixed_length: bool,
    pub max_length: usize,
    pub initial_value: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Notify Targets
// ----------------------------------------------------------------------------

/// Destination of an outgoing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyTarget {
    /// Every connection subscribed to the data characteristic
    All,
    /// A single connection
    Connection(ConnectionId),
}

impl NotifyTarget {
    /// Wire value used by stacks that address "all" with a sentinel
    pub fn raw(self) -> u8 {
        match self {
            NotifyTarget::All => NOTIFY_ALL_CONNECTIONS,
            NotifyTarget::Connection(id) => id.raw(),
        }
    }
}

// ----------------------------------------------------------------------------
// Link Stack Trait
// ----------------------------------------------------------------------------

/// Operations the transport issues against the external link stack
///
/// Implementations are shared between the event-dispatch path and any number
/// of application threads flushing the outbound queue, so every method takes
/// `&self` and the implementation is responsible for its own synchronization.
pub trait LinkStack: Send + Sync {
    /// Maximum number of simultaneous connections the stack supports
    fn max_connections(&self) -> usize;

    /// Identity address of the local controller
    fn identity_address(&self) -> Result<(BdAddr, AddressType), LinkError>;

    // Advertising

    fn create_advertising_set(&self) -> Result<AdvertisingSetHandle, LinkError>;

    fn delete_advertising_set(&self, handle: AdvertisingSetHandle) -> Result<(), LinkError>;

    fn set_advertising_timing(
        &self,
        handle: AdvertisingSetHandle,
        config: &AdvertisingConfig,
    ) -> Result<(), LinkError>;

    fn generate_advertising_data(
        &self,
        handle: AdvertisingSetHandle,
        mode: DiscoveryMode,
    ) -> Result<(), LinkError>;

    fn start_legacy_advertising(
        &self,
        handle: AdvertisingSetHandle,
        mode: ConnectionMode,
    ) -> Result<(), LinkError>;

    fn stop_advertising(&self, handle: AdvertisingSetHandle) -> Result<(), LinkError>;

    // Connections and data

    fn notify(
        &self,
        connection: ConnectionId,
        attribute: AttributeHandle,
        data: &[u8],
    ) -> Result<(), LinkError>;

    fn notify_all(&self, attribute: AttributeHandle, data: &[u8]) -> Result<(), LinkError>;

    fn close_connection(&self, connection: ConnectionId) -> Result<(), LinkError>;

    fn write_attribute_value(
        &self,
        attribute: AttributeHandle,
        offset: u16,
        value: &[u8],
    ) -> Result<(), LinkError>;

    // GATT database

    fn gattdb_new_session(&self) -> Result<GattSessionId, LinkError>;

    fn gattdb_add_service(
        &self,
        session: GattSessionId,
        service: &ServiceSpec,
    ) -> Result<AttributeHandle, LinkError>;

    fn gattdb_add_characteristic(
        &self,
        session: GattSessionId,
        service: AttributeHandle,
        characteristic: &CharacteristicSpec,
    ) -> Result<AttributeHandle, LinkError>;

    fn gattdb_start_service(
        &self,
        session: GattSessionId,
        service: AttributeHandle,
    ) -> Result<(), LinkError>;

    fn gattdb_commit(&self, session: GattSessionId) -> Result<(), LinkError>;
}
