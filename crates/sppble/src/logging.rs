//! Runtime-switchable diagnostics
//!
//! The transport logs through `tracing`, but only while logging is enabled on
//! the instance. Every event carries the configured tag as a field so several
//! transports can share one subscriber.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use sppble_core::LogConfig;

/// Enabled flag and tag consulted before each log emission
#[derive(Debug)]
pub struct LogSettings {
    enabled: AtomicBool,
    tag: RwLock<String>,
}

impl LogSettings {
    pub fn new(config: &LogConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            tag: RwLock::new(config.tag.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn tag(&self) -> String {
        self.tag.read().clone()
    }

    pub fn set_tag(&self, tag: impl Into<String>) {
        *self.tag.write() = tag.into();
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::new(&LogConfig::default())
    }
}

/// Emit a `tracing` event at `$level` if `$settings` has logging enabled
macro_rules! spp_log {
    ($settings:expr, $level:ident, $($arg:tt)+) => {
        if $settings.is_enabled() {
            let tag = $settings.tag();
            tracing::$level!(tag = %tag, $($arg)+);
        }
    };
}

pub(crate) use spp_log;
