//! Bounded registry of active peer connections

use core::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::types::{BdAddr, BondingHandle, ConnectionId};

// ----------------------------------------------------------------------------
// Connection Record
// ----------------------------------------------------------------------------

/// One active link-layer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Whether the local device is the central of this connection
    pub is_master: bool,
    pub connection: ConnectionId,
    pub bonding: BondingHandle,
    pub address: BdAddr,
}

impl ConnectionRecord {
    /// Record for a connection accepted while advertising as a peripheral
    pub fn peripheral(connection: ConnectionId, bonding: BondingHandle, address: BdAddr) -> Self {
        Self {
            is_master: false,
            connection,
            bonding,
            address,
        }
    }

    pub fn role_name(&self) -> &'static str {
        if self.is_master {
            "master"
        } else {
            "slave"
        }
    }
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conn:{} bonding:{} {} addr:{}",
            self.connection,
            self.bonding,
            self.role_name(),
            self.address
        )
    }
}

// ----------------------------------------------------------------------------
// Connection Registry
// ----------------------------------------------------------------------------

/// Ordered set of connection records with a hard capacity
///
/// Identity is the connection id: no two records share one, and records are
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    records: SmallVec<[ConnectionRecord; 4]>,
    capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: SmallVec::new(),
            capacity,
        }
    }

    /// Append a record; fails without mutating when at capacity or when the
    /// connection id is already registered
    pub fn add(&mut self, record: ConnectionRecord) -> bool {
        if self.at_capacity() || self.contains(record.connection) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Remove the record for `connection`, returning it if present
    pub fn remove(&mut self, connection: ConnectionId) -> Option<ConnectionRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.connection == connection)?;
        Some(self.records.remove(idx))
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.records.iter().any(|r| r.connection == connection)
    }

    pub fn get(&self, connection: ConnectionId) -> Option<&ConnectionRecord> {
        self.records.iter().find(|r| r.connection == connection)
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn at_capacity(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionRecord> {
        self.records.iter()
    }

    pub fn for_each<F: FnMut(&ConnectionRecord)>(&self, f: F) {
        self.records.iter().for_each(f);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
