//! Mock Link Stack for Testing
//!
//! A deterministic in-memory [`LinkStack`] that records every call, hands out
//! sequential handles and can be told to fail specific operations.

use std::collections::HashSet;

use parking_lot::Mutex;
use sppble_core::{
    AddressType, AdvertisingConfig, AdvertisingSetHandle, AttributeHandle, BdAddr,
    CharacteristicSpec, ConnectionId, ConnectionMode, DiscoveryMode, GattSessionId, LinkError,
    LinkStack, NotifyTarget, ServiceSpec,
};
use tracing::debug;

// ----------------------------------------------------------------------------
// Mock Configuration
// ----------------------------------------------------------------------------

/// Fixed properties of the simulated controller
#[derive(Debug, Clone)]
pub struct MockLinkConfig {
    pub max_connections: usize,
    pub identity: BdAddr,
    pub address_type: AddressType,
}

impl Default for MockLinkConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            identity: BdAddr::new([0x56, 0x34, 0x12, 0xEF, 0xCD, 0xAB]),
            address_type: AddressType::Public,
        }
    }
}

impl MockLinkConfig {
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_identity(mut self, identity: BdAddr) -> Self {
        self.identity = identity;
        self
    }
}

// ----------------------------------------------------------------------------
// Recorded Calls
// ----------------------------------------------------------------------------

/// Operation categories that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkOp {
    IdentityAddress,
    CreateAdvertisingSet,
    DeleteAdvertisingSet,
    SetAdvertisingTiming,
    GenerateAdvertisingData,
    StartAdvertising,
    StopAdvertising,
    Notify,
    NotifyAll,
    CloseConnection,
    WriteAttribute,
    GattNewSession,
    GattAddService,
    GattAddCharacteristic,
    GattStartService,
    GattCommit,
}

impl LinkOp {
    fn name(self) -> &'static str {
        match self {
            LinkOp::IdentityAddress => "identity_address",
            LinkOp::CreateAdvertisingSet => "create_advertising_set",
            LinkOp::DeleteAdvertisingSet => "delete_advertising_set",
            LinkOp::SetAdvertisingTiming => "set_advertising_timing",
            LinkOp::GenerateAdvertisingData => "generate_advertising_data",
            LinkOp::StartAdvertising => "start_legacy_advertising",
            LinkOp::StopAdvertising => "stop_advertising",
            LinkOp::Notify => "notify",
            LinkOp::NotifyAll => "notify_all",
            LinkOp::CloseConnection => "close_connection",
            LinkOp::WriteAttribute => "write_attribute_value",
            LinkOp::GattNewSession => "gattdb_new_session",
            LinkOp::GattAddService => "gattdb_add_service",
            LinkOp::GattAddCharacteristic => "gattdb_add_characteristic",
            LinkOp::GattStartService => "gattdb_start_service",
            LinkOp::GattCommit => "gattdb_commit",
        }
    }
}

/// One call made against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    CreateAdvertisingSet(AdvertisingSetHandle),
    DeleteAdvertisingSet(AdvertisingSetHandle),
    SetAdvertisingTiming(AdvertisingSetHandle, AdvertisingConfig),
    GenerateAdvertisingData(AdvertisingSetHandle, DiscoveryMode),
    StartAdvertising(AdvertisingSetHandle, ConnectionMode),
    StopAdvertising(AdvertisingSetHandle),
    CloseConnection(ConnectionId),
    WriteAttribute(AttributeHandle, Vec<u8>),
    GattNewSession(GattSessionId),
    GattAddService(ServiceSpec, AttributeHandle),
    GattAddCharacteristic(AttributeHandle, CharacteristicSpec, AttributeHandle),
    GattStartService(AttributeHandle),
    GattCommit(GattSessionId),
}

/// A notification that reached the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub target: NotifyTarget,
    pub attribute: AttributeHandle,
    pub data: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Mock Link Stack
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<LinkCall>,
    notifications: Vec<Notification>,
    failing: HashSet<LinkOp>,
    failing_closes: HashSet<ConnectionId>,
    live_sets: HashSet<AdvertisingSetHandle>,
    next_set: u8,
    next_session: u16,
    next_attribute: u16,
}

/// In-memory link stack that records calls for assertions
#[derive(Debug)]
pub struct MockLinkStack {
    config: MockLinkConfig,
    state: Mutex<MockState>,
}

impl MockLinkStack {
    pub fn new() -> Self {
        Self::with_config(MockLinkConfig::default())
    }

    pub fn with_config(config: MockLinkConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MockState {
                next_attribute: 1,
                ..MockState::default()
            }),
        }
    }

    pub fn with_max_connections(max: usize) -> Self {
        Self::with_config(MockLinkConfig::default().with_max_connections(max))
    }

    pub fn identity(&self) -> BdAddr {
        self.config.identity
    }

    // ------------------------------------------------------------------------
    // Failure Injection
    // ------------------------------------------------------------------------

    /// Make every subsequent call of `op` fail with a status error
    pub fn fail(&self, op: LinkOp) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: LinkOp) {
        self.state.lock().failing.remove(&op);
    }

    /// Make `close_connection` fail for one connection only
    pub fn fail_close(&self, connection: ConnectionId) {
        self.state.lock().failing_closes.insert(connection);
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn calls(&self) -> Vec<LinkCall> {
        self.state.lock().calls.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    /// All notified bytes in order, regardless of target
    pub fn notified_bytes(&self) -> Vec<u8> {
        self.state
            .lock()
            .notifications
            .iter()
            .flat_map(|n| n.data.iter().copied())
            .collect()
    }

    pub fn advertising_started_count(&self) -> usize {
        self.count(|call| matches!(call, LinkCall::StartAdvertising(..)))
    }

    pub fn services_added(&self) -> usize {
        self.count(|call| matches!(call, LinkCall::GattAddService(..)))
    }

    pub fn closed_connections(&self) -> Vec<ConnectionId> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                LinkCall::CloseConnection(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn attribute_writes(&self) -> Vec<(AttributeHandle, Vec<u8>)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                LinkCall::WriteAttribute(handle, value) => Some((*handle, value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Characteristic handle allocated for `uuid`, if one was added
    pub fn characteristic_handle(&self, uuid: sppble_core::AttributeUuid) -> Option<AttributeHandle> {
        self.state.lock().calls.iter().find_map(|call| match call {
            LinkCall::GattAddCharacteristic(_, spec, handle) if spec.uuid == uuid => Some(*handle),
            _ => None,
        })
    }

    pub fn live_advertising_sets(&self) -> usize {
        self.state.lock().live_sets.len()
    }

    pub fn clear_history(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.notifications.clear();
    }

    fn count(&self, pred: impl Fn(&LinkCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| pred(*call)).count()
    }

    fn check(state: &MockState, op: LinkOp) -> Result<(), LinkError> {
        if state.failing.contains(&op) {
            debug!("mock link: injected failure for {}", op.name());
            return Err(LinkError::status(op.name(), 0x0181));
        }
        Ok(())
    }

    fn next_attribute(state: &mut MockState) -> AttributeHandle {
        let handle = AttributeHandle(state.next_attribute);
        state.next_attribute += 1;
        handle
    }
}

impl Default for MockLinkStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStack for MockLinkStack {
    fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    fn identity_address(&self) -> Result<(BdAddr, AddressType), LinkError> {
        let state = self.state.lock();
        Self::check(&state, LinkOp::IdentityAddress)?;
        Ok((self.config.identity, self.config.address_type))
    }

    fn create_advertising_set(&self) -> Result<AdvertisingSetHandle, LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::CreateAdvertisingSet)?;
        let handle = AdvertisingSetHandle(state.next_set);
        state.next_set = state.next_set.wrapping_add(1);
        state.live_sets.insert(handle);
        state.calls.push(LinkCall::CreateAdvertisingSet(handle));
        Ok(handle)
    }

    fn delete_advertising_set(&self, handle: AdvertisingSetHandle) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::DeleteAdvertisingSet)?;
        state.calls.push(LinkCall::DeleteAdvertisingSet(handle));
        if !state.live_sets.remove(&handle) {
            return Err(LinkError::NotFound {
                operation: LinkOp::DeleteAdvertisingSet.name(),
            });
        }
        Ok(())
    }

    fn set_advertising_timing(
        &self,
        handle: AdvertisingSetHandle,
        config: &AdvertisingConfig,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::SetAdvertisingTiming)?;
        state
            .calls
            .push(LinkCall::SetAdvertisingTiming(handle, config.clone()));
        Ok(())
    }

    fn generate_advertising_data(
        &self,
        handle: AdvertisingSetHandle,
        mode: DiscoveryMode,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::GenerateAdvertisingData)?;
        state
            .calls
            .push(LinkCall::GenerateAdvertisingData(handle, mode));
        Ok(())
    }

    fn start_legacy_advertising(
        &self,
        handle: AdvertisingSetHandle,
        mode: ConnectionMode,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::StartAdvertising)?;
        if !state.live_sets.contains(&handle) {
            return Err(LinkError::InvalidHandle {
                operation: LinkOp::StartAdvertising.name(),
            });
        }
        state.calls.push(LinkCall::StartAdvertising(handle, mode));
        Ok(())
    }

    fn stop_advertising(&self, handle: AdvertisingSetHandle) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::StopAdvertising)?;
        state.calls.push(LinkCall::StopAdvertising(handle));
        Ok(())
    }

    fn notify(
        &self,
        connection: ConnectionId,
        attribute: AttributeHandle,
        data: &[u8],
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::Notify)?;
        state.notifications.push(Notification {
            target: NotifyTarget::Connection(connection),
            attribute,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn notify_all(&self, attribute: AttributeHandle, data: &[u8]) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::NotifyAll)?;
        state.notifications.push(Notification {
            target: NotifyTarget::All,
            attribute,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn close_connection(&self, connection: ConnectionId) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::CloseConnection)?;
        if state.failing_closes.contains(&connection) {
            return Err(LinkError::status(LinkOp::CloseConnection.name(), 0x0102));
        }
        state.calls.push(LinkCall::CloseConnection(connection));
        Ok(())
    }

    fn write_attribute_value(
        &self,
        attribute: AttributeHandle,
        offset: u16,
        value: &[u8],
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::WriteAttribute)?;
        if offset != 0 {
            return Err(LinkError::status(LinkOp::WriteAttribute.name(), 0x0107));
        }
        state
            .calls
            .push(LinkCall::WriteAttribute(attribute, value.to_vec()));
        Ok(())
    }

    fn gattdb_new_session(&self) -> Result<GattSessionId, LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::GattNewSession)?;
        let session = GattSessionId(state.next_session);
        state.next_session += 1;
        state.calls.push(LinkCall::GattNewSession(session));
        Ok(session)
    }

    fn gattdb_add_service(
        &self,
        _session: GattSessionId,
        service: &ServiceSpec,
    ) -> Result<AttributeHandle, LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::GattAddService)?;
        let handle = Self::next_attribute(&mut state);
        state
            .calls
            .push(LinkCall::GattAddService(service.clone(), handle));
        Ok(handle)
    }

    fn gattdb_add_characteristic(
        &self,
        _session: GattSessionId,
        service: AttributeHandle,
        characteristic: &CharacteristicSpec,
    ) -> Result<AttributeHandle, LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::GattAddCharacteristic)?;
        let handle = Self::next_attribute(&mut state);
        state.calls.push(LinkCall::GattAddCharacteristic(
            service,
            characteristic.clone(),
            handle,
        ));
        Ok(handle)
    }

    fn gattdb_start_service(
        &self,
        _session: GattSessionId,
        service: AttributeHandle,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::GattStartService)?;
        state.calls.push(LinkCall::GattStartService(service));
        Ok(())
    }

    fn gattdb_commit(&self, session: GattSessionId) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check(&state, LinkOp::GattCommit)?;
        state.calls.push(LinkCall::GattCommit(session));
        Ok(())
    }
}
