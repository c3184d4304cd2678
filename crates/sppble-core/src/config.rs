//! Transport configuration

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SppError};
use crate::protocol::{DEFAULT_MTU, DEFAULT_QUEUE_CAPACITY};

// ----------------------------------------------------------------------------
// Advertising
// ----------------------------------------------------------------------------

/// Discoverability advertised in legacy advertising data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    NonDiscoverable,
    LimitedDiscoverable,
    #[default]
    GeneralDiscoverable,
    Broadcast,
}

/// Whether centrals may connect to the advertising set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    NonConnectable,
    #[default]
    Connectable,
    Scannable,
}

/// Parameters applied the next time advertising is (re)configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvertisingConfig {
    pub discovery_mode: DiscoveryMode,
    pub connection_mode: ConnectionMode,
    /// Minimum interval in units of 0.625 ms
    pub interval_min: u32,
    /// Maximum interval in units of 0.625 ms
    pub interval_max: u32,
    /// Advertising duration in units of 10 ms, 0 = unlimited
    pub duration: u16,
    /// Maximum advertising events before stopping, 0 = unlimited
    pub max_events: u8,
}

impl Default for AdvertisingConfig {
    fn default() -> Self {
        Self {
            discovery_mode: DiscoveryMode::GeneralDiscoverable,
            connection_mode: ConnectionMode::Connectable,
            interval_min: 160, // 100 ms
            interval_max: 160,
            duration: 0,
            max_events: 0,
        }
    }
}

// ----------------------------------------------------------------------------
// Logging
// ----------------------------------------------------------------------------

/// Initial diagnostics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    pub tag: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tag: "[sppBLE] ".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Transport Configuration
// ----------------------------------------------------------------------------

/// Configuration for the serial-port transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SppConfig {
    /// Base device name
    pub device_name: String,
    /// Append the low three bytes of the identity address to the name
    pub name_shows_identifier: bool,
    /// Capacity of each byte queue
    pub queue_capacity: usize,
    /// Largest payload per notification
    pub mtu: usize,
    /// Advertising parameters
    pub advertising: AdvertisingConfig,
    /// Diagnostics
    pub log: LogConfig,
}

impl Default for SppConfig {
    fn default() -> Self {
        Self {
            device_name: "motor".to_string(),
            name_shows_identifier: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mtu: DEFAULT_MTU,
            advertising: AdvertisingConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl SppConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn with_name_shows_identifier(mut self, enabled: bool) -> Self {
        self.name_shows_identifier = enabled;
        self
    }

    pub fn with_advertising(mut self, advertising: AdvertisingConfig) -> Self {
        self.advertising = advertising;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log.enabled = enabled;
        self
    }

    pub fn with_log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log.tag = tag.into();
        self
    }

    /// Reject configurations the transport cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(config_error("queue_capacity must be non-zero"));
        }
        if self.mtu == 0 {
            return Err(config_error("mtu must be non-zero"));
        }
        if self.mtu > self.queue_capacity {
            return Err(config_error("mtu must not exceed queue_capacity"));
        }
        if self.advertising.interval_min > self.advertising.interval_max {
            return Err(config_error("advertising interval_min exceeds interval_max"));
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> SppError {
    SppError::Config {
        reason: reason.to_string(),
    }
}
