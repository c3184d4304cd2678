//! Advertising controller
//!
//! Owns the single advertising set the transport uses. Parameters can be
//! changed at any time; they take effect the next time the set is
//! configured.

use sppble_core::{
    AdvertisingConfig, AdvertisingSetHandle, ConnectionMode, DiscoveryMode, LinkError, LinkStack,
};

// ----------------------------------------------------------------------------
// Advertising Controller
// ----------------------------------------------------------------------------

/// Configures, starts and stops legacy advertising on the link stack
#[derive(Debug, Default)]
pub struct AdvertisingController {
    config: AdvertisingConfig,
    handle: Option<AdvertisingSetHandle>,
    advertising: bool,
}

impl AdvertisingController {
    pub fn new(config: AdvertisingConfig) -> Self {
        Self {
            config,
            handle: None,
            advertising: false,
        }
    }

    /// Delete any existing set, create a fresh one and apply the timing
    pub fn configure(&mut self, link: &dyn LinkStack) -> Result<AdvertisingSetHandle, LinkError> {
        if let Some(previous) = self.handle.take() {
            self.advertising = false;
            delete_set(link, previous)?;
        }

        let handle = link.create_advertising_set()?;
        self.handle = Some(handle);
        link.set_advertising_timing(handle, &self.config)?;
        Ok(handle)
    }

    /// Generate advertising data and start legacy advertising
    ///
    /// Returns `false` without touching the stack if no set has been
    /// configured yet.
    pub fn start(&mut self, link: &dyn LinkStack) -> Result<bool, LinkError> {
        let Some(handle) = self.handle else {
            return Ok(false);
        };

        link.generate_advertising_data(handle, self.config.discovery_mode)?;
        link.start_legacy_advertising(handle, self.config.connection_mode)?;
        self.advertising = true;
        Ok(true)
    }

    /// Stop advertising and release the set
    pub fn stop(&mut self, link: &dyn LinkStack) -> Result<(), LinkError> {
        let Some(handle) = self.handle else {
            return Ok(());
        };

        link.stop_advertising(handle)?;
        self.advertising = false;
        delete_set(link, handle)?;
        self.handle = None;
        Ok(())
    }

    /// Legacy connectable advertising ends when a central connects
    pub fn mark_stopped_by_connection(&mut self) {
        self.advertising = false;
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn handle(&self) -> Option<AdvertisingSetHandle> {
        self.handle
    }

    pub fn config(&self) -> &AdvertisingConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AdvertisingConfig) {
        self.config = config;
    }

    pub fn set_discovery_mode(&mut self, mode: DiscoveryMode) {
        self.config.discovery_mode = mode;
    }

    pub fn set_connection_mode(&mut self, mode: ConnectionMode) {
        self.config.connection_mode = mode;
    }

    pub fn set_interval(&mut self, min: u32, max: u32) {
        self.config.interval_min = min;
        self.config.interval_max = max;
    }

    pub fn set_duration(&mut self, duration: u16) {
        self.config.duration = duration;
    }

    pub fn set_max_events(&mut self, max_events: u8) {
        self.config.max_events = max_events;
    }
}

// "not found" means the stack already dropped the set
fn delete_set(link: &dyn LinkStack, handle: AdvertisingSetHandle) -> Result<(), LinkError> {
    match link.delete_advertising_set(handle) {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}
