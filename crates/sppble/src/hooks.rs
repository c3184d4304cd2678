//! Embedder callback slots
//!
//! Each category holds at most one callback. Registration always takes a
//! concrete closure, so a slot can be replaced but never cleared by accident.

use std::sync::Arc;

use sppble_core::{ConnectionId, GattSessionId, LinkEvent, LinkStack};

pub type RawEventHook = Arc<dyn Fn(&LinkEvent) + Send + Sync>;
pub type ConnectionHook = Arc<dyn Fn(ConnectionId) + Send + Sync>;
pub type GattDbHook = Box<dyn FnMut(&dyn LinkStack, GattSessionId) + Send>;
pub type SendCondition = Arc<dyn Fn(usize, &[u8]) -> bool + Send + Sync>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub raw_event: Option<RawEventHook>,
    pub connect: Option<ConnectionHook>,
    pub disconnect: Option<ConnectionHook>,
    pub gatt_db_init: Option<GattDbHook>,
}

impl Hooks {
    pub fn raw_event(&self) -> Option<RawEventHook> {
        self.raw_event.clone()
    }

    pub fn connect(&self) -> Option<ConnectionHook> {
        self.connect.clone()
    }

    pub fn disconnect(&self) -> Option<ConnectionHook> {
        self.disconnect.clone()
    }
}
