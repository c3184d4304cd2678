//! Link event dispatch
//!
//! The embedder feeds every event from the link stack into
//! [`SppTransport::handle_event`], one at a time.

use sppble_core::{
    AttributeHandle, BdAddr, BondingHandle, ConnectionId, ConnectionRecord, LinkEvent, Result,
    SppError,
};

use crate::logging::spp_log;
use crate::session::{SessionEvent, SessionState};
use crate::transport::SppTransport;

impl SppTransport {
    /// Route one link event
    ///
    /// The raw-event hook sees the event first. Connect and disconnect hooks
    /// run after the transport has updated its own state, even when
    /// re-advertising afterwards failed. Connections opened before the
    /// session reaches `Idle` are not registered.
    pub fn handle_event(&self, event: &LinkEvent) -> Result<()> {
        let raw_hook = self.hooks.lock().raw_event();
        if let Some(hook) = raw_hook {
            hook(event);
        }

        let result = match event {
            LinkEvent::SystemBoot => self.on_system_boot(),
            LinkEvent::ConnectionOpened {
                connection,
                bonding,
                address,
            } => self.on_connection_opened(*connection, *bonding, *address),
            LinkEvent::ConnectionClosed { connection, reason } => {
                self.on_connection_closed(*connection, *reason)
            }
            LinkEvent::AttributeValue { attribute, payload } => {
                self.on_attribute_value(*attribute, payload);
                Ok(())
            }
            LinkEvent::Other { id } => {
                spp_log!(self.log, trace, "unhandled event 0x{:08X}", id);
                Ok(())
            }
        };

        if let Err(e) = &result {
            spp_log!(self.log, error, "{} handling failed: {}", event.kind(), e);
        }
        result
    }

    fn on_system_boot(&self) -> Result<()> {
        let mut control = self.control.lock();
        control.stack_booted = true;
        spp_log!(self.log, info, "link stack booted");

        let transition = control.state.transition(SessionEvent::StackBooted);
        self.apply(&mut control, transition)
    }

    fn on_connection_opened(
        &self,
        connection: ConnectionId,
        bonding: BondingHandle,
        address: BdAddr,
    ) -> Result<()> {
        let result = {
            let mut control = self.control.lock();
            if !matches!(control.state, SessionState::Idle | SessionState::Active) {
                spp_log!(
                    self.log,
                    warn,
                    "connection {} ignored: session is {}",
                    connection,
                    control.state
                );
                return Ok(());
            }
            if control.registry.contains(connection) {
                spp_log!(self.log, warn, "connection {} already registered", connection);
                return Err(SppError::DuplicateConnection { connection });
            }

            let record = ConnectionRecord::peripheral(connection, bonding, address);
            if !control.registry.add(record) {
                let capacity = control.registry.capacity();
                spp_log!(
                    self.log,
                    warn,
                    "connection {} rejected: registry full ({} of {})",
                    connection,
                    control.registry.count(),
                    capacity
                );
                return Err(SppError::RegistryFull { capacity });
            }
            spp_log!(self.log, info, "connection opened: {}", record);

            control.advertising.mark_stopped_by_connection();
            let transition = control.state.transition(SessionEvent::ConnectionOpened {
                connections: control.registry.count(),
                capacity: control.registry.capacity(),
            });
            self.apply(&mut control, transition)
        };

        let hook = self.hooks.lock().connect();
        if let Some(hook) = hook {
            hook(connection);
        }
        result
    }

    fn on_connection_closed(&self, connection: ConnectionId, reason: u16) -> Result<()> {
        let result = {
            let mut control = self.control.lock();
            if control.registry.remove(connection).is_none() {
                spp_log!(self.log, debug, "close for unknown connection {}", connection);
            }
            spp_log!(
                self.log,
                info,
                "connection {} closed, reason 0x{:04X}",
                connection,
                reason
            );

            let transition = control.state.transition(SessionEvent::ConnectionClosed {
                connections: control.registry.count(),
                capacity: control.registry.capacity(),
            });
            self.apply(&mut control, transition)
        };

        let hook = self.hooks.lock().disconnect();
        if let Some(hook) = hook {
            hook(connection);
        }
        result
    }

    fn on_attribute_value(&self, attribute: AttributeHandle, payload: &[u8]) {
        if self.stream.data_channel() != Some(attribute) {
            spp_log!(self.log, trace, "write to foreign attribute {} ignored", attribute);
            return;
        }
        spp_log!(self.log, debug, "GATT data received: {} bytes", payload.len());
        self.stream.admit_inbound(payload);
    }
}
