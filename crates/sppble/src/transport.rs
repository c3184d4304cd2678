//! The serial-port transport
//!
//! [`SppTransport`] ties the pieces together: the byte stream, the session
//! machine, the connection registry, advertising and the GATT database. All
//! control-path state lives behind one lock; the stream has its own locks so
//! application threads can read and write while events are being handled.

use std::sync::Arc;

use parking_lot::Mutex;
use sppble_core::{
    AdvertisingConfig, ConnectionId, ConnectionMode, ConnectionRecord, ConnectionRegistry,
    DiscoveryMode, GattSessionId, LinkEvent, LinkStack, NotifyTarget, Result, SppConfig, SppError,
};

use crate::advertising::AdvertisingController;
use crate::bootstrap::GattDescriptor;
use crate::hooks::Hooks;
use crate::logging::{spp_log, LogSettings};
use crate::session::{SessionEffect, SessionEvent, SessionState, SessionTransition};
use crate::stream::SppStream;

// ----------------------------------------------------------------------------
// Control State
// ----------------------------------------------------------------------------

pub(crate) struct Control {
    pub state: SessionState,
    pub stack_booted: bool,
    pub registry: ConnectionRegistry,
    pub gatt: GattDescriptor,
    pub advertising: AdvertisingController,
}

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

/// Byte-stream transport over a BLE GATT notify/write characteristic
///
/// Share it between the event-dispatch thread and application threads with
/// an `Arc`; every method takes `&self`.
pub struct SppTransport {
    pub(crate) link: Arc<dyn LinkStack>,
    pub(crate) stream: SppStream,
    pub(crate) control: Mutex<Control>,
    pub(crate) hooks: Mutex<Hooks>,
    pub(crate) log: Arc<LogSettings>,
}

impl SppTransport {
    /// Create a transport with the default configuration
    pub fn new(link: Arc<dyn LinkStack>) -> Self {
        Self::build(link, SppConfig::default())
    }

    /// Create a transport with a validated configuration
    pub fn with_config(link: Arc<dyn LinkStack>, config: SppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(link, config))
    }

    fn build(link: Arc<dyn LinkStack>, config: SppConfig) -> Self {
        let log = Arc::new(LogSettings::new(&config.log));
        let capacity = link.max_connections();
        let stream = SppStream::new(link.clone(), log.clone(), config.queue_capacity, config.mtu);

        Self {
            link,
            stream,
            control: Mutex::new(Control {
                state: SessionState::NotStarted,
                stack_booted: false,
                registry: ConnectionRegistry::new(capacity),
                gatt: GattDescriptor::new(config.device_name, config.name_shows_identifier),
                advertising: AdvertisingController::new(config.advertising),
            }),
            hooks: Mutex::new(Hooks::default()),
            log,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Build the GATT database and begin advertising
    ///
    /// If the link stack has not booted yet, advertising begins when the
    /// boot event arrives. Calling `start` on a running session does nothing.
    pub fn start(&self, name: &str) -> Result<()> {
        let mut control = self.control.lock();
        if control.state.is_started() {
            spp_log!(self.log, debug, "start ignored in state {}", control.state);
            return Ok(());
        }

        self.rename(&mut control, name);
        self.bootstrap(&mut control)?;

        let event = SessionEvent::Start {
            stack_booted: control.stack_booted,
        };
        let transition = control.state.transition(event);
        self.apply(&mut control, transition)?;
        spp_log!(self.log, info, "started as {}", control.gatt.full_name());
        Ok(())
    }

    /// Stop advertising, close every connection and reset to `NotStarted`
    ///
    /// If any close fails the error is returned and the registry, queues and
    /// state are left as they were.
    pub fn end(&self) -> Result<()> {
        let mut control = self.control.lock();

        control
            .advertising
            .stop(self.link.as_ref())
            .map_err(|source| SppError::Advertising { source })?;

        for record in control.registry.iter() {
            self.link
                .close_connection(record.connection)
                .map_err(|source| SppError::TeardownFailed {
                    connection: record.connection,
                    source,
                })?;
        }

        self.stream.clear();
        control.registry.clear();
        let transition = control.state.transition(SessionEvent::Ended);
        self.apply(&mut control, transition)?;
        spp_log!(self.log, info, "ended");
        Ok(())
    }

    pub(crate) fn bootstrap(&self, control: &mut Control) -> Result<()> {
        if control.gatt.is_initialized() {
            return Ok(());
        }

        // Take the hook out so user code never runs under the hooks lock
        let mut hook = self.hooks.lock().gatt_db_init.take();
        let result = control
            .gatt
            .bootstrap(self.link.as_ref(), self.stream.mtu(), hook.as_mut());
        if let Some(hook) = hook {
            self.hooks.lock().gatt_db_init.get_or_insert(hook);
        }

        match result {
            Ok(handles) => {
                self.stream.bind_data_channel(handles.data_channel);
                spp_log!(
                    self.log,
                    debug,
                    "GATT database committed, data characteristic {}",
                    handles.data_channel
                );
                Ok(())
            }
            Err(e) => {
                spp_log!(self.log, error, "{}", e);
                Err(e)
            }
        }
    }

    /// Run a transition's effects and commit its target state
    ///
    /// Lifecycle transitions commit only once every effect succeeded.
    /// Connection transitions commit first, so a failed re-advertise is
    /// reported without leaving the state out of step with the registry.
    pub(crate) fn apply(&self, control: &mut Control, transition: SessionTransition) -> Result<()> {
        if transition.is_noop() {
            return Ok(());
        }
        if transition.commit_before_effects {
            self.commit(control, &transition);
        }

        for effect in &transition.effects {
            let result = match effect {
                SessionEffect::ConfigureAdvertising => control
                    .advertising
                    .configure(self.link.as_ref())
                    .map(|_| ()),
                SessionEffect::StartAdvertising => control
                    .advertising
                    .start(self.link.as_ref())
                    .map(|_| ()),
            };
            if let Err(source) = result {
                spp_log!(self.log, error, "advertising {:?} failed: {}", effect, source);
                return Err(SppError::Advertising { source });
            }
        }

        if !transition.commit_before_effects {
            self.commit(control, &transition);
        }
        Ok(())
    }

    fn commit(&self, control: &mut Control, transition: &SessionTransition) {
        if transition.from != transition.to {
            spp_log!(self.log, debug, "state {} -> {}", transition.from, transition.to);
        }
        control.state = transition.to;
    }

    // ------------------------------------------------------------------------
    // Stream
    // ------------------------------------------------------------------------

    /// Bytes waiting to be read
    pub fn available(&self) -> usize {
        self.stream.available()
    }

    pub fn read(&self) -> Option<u8> {
        self.stream.read()
    }

    /// Next byte without consuming it; `None` may also mean the inbound
    /// queue is busy, see [`SppStream::peek`]
    pub fn peek(&self) -> Option<u8> {
        self.stream.peek()
    }

    pub fn write(&self, bytes: &[u8]) -> usize {
        self.stream.write(bytes)
    }

    pub fn write_byte(&self, byte: u8) -> usize {
        self.stream.write_byte(byte)
    }

    /// Notify all connections with up to one MTU of queued bytes
    pub fn flush(&self) -> usize {
        self.stream.flush()
    }

    pub fn flush_to(&self, target: NotifyTarget) -> usize {
        self.stream.flush_to(target)
    }

    /// Send bytes immediately, bypassing the outbound queue
    pub fn send_data(&self, target: NotifyTarget, data: &[u8]) -> usize {
        self.stream.send_data(target, data)
    }

    pub fn send_message(&self, target: NotifyTarget, message: &str) -> usize {
        self.stream.send_data(target, message.as_bytes())
    }

    /// Replace the flush policy used by `write`
    ///
    /// The predicate receives the index of the byte just queued (or the total
    /// length, once after the last byte) and the slice being written.
    pub fn set_send_condition<F>(&self, condition: F)
    where
        F: Fn(usize, &[u8]) -> bool + Send + Sync + 'static,
    {
        self.stream.set_send_condition(Arc::new(condition));
    }

    // ------------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------------

    /// Observe every link event before the transport handles it
    pub fn on_raw_event<F>(&self, hook: F)
    where
        F: Fn(&LinkEvent) + Send + Sync + 'static,
    {
        self.hooks.lock().raw_event = Some(Arc::new(hook));
    }

    pub fn on_connect<F>(&self, hook: F)
    where
        F: Fn(ConnectionId) + Send + Sync + 'static,
    {
        self.hooks.lock().connect = Some(Arc::new(hook));
    }

    pub fn on_disconnect<F>(&self, hook: F)
    where
        F: Fn(ConnectionId) + Send + Sync + 'static,
    {
        self.hooks.lock().disconnect = Some(Arc::new(hook));
    }

    /// Add services to the GATT session before it is committed
    pub fn on_gatt_db_init<F>(&self, hook: F)
    where
        F: FnMut(&dyn LinkStack, GattSessionId) + Send + 'static,
    {
        self.hooks.lock().gatt_db_init = Some(Box::new(hook));
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Change the base device name, updating the live characteristic if the
    /// database already exists
    pub fn set_device_name(&self, name: &str) {
        let mut control = self.control.lock();
        self.rename(&mut control, name);
    }

    fn rename(&self, control: &mut Control, name: &str) {
        if let Err(e) = control.gatt.set_device_name(self.link.as_ref(), name) {
            spp_log!(self.log, warn, "Setting new advertised name in GATT DB failed: {}", e);
        }
    }

    pub fn device_name(&self) -> String {
        self.control.lock().gatt.device_name().to_string()
    }

    /// Device name including the address suffix, as advertised
    pub fn full_device_name(&self) -> String {
        self.control.lock().gatt.full_name()
    }

    /// Takes effect at the next bootstrap or name change
    pub fn set_name_shows_identifier(&self, enabled: bool) {
        self.control.lock().gatt.set_name_shows_identifier(enabled);
    }

    pub fn name_shows_identifier(&self) -> bool {
        self.control.lock().gatt.name_shows_identifier()
    }

    pub fn advertising_config(&self) -> AdvertisingConfig {
        self.control.lock().advertising.config().clone()
    }

    pub fn set_advertising_config(&self, config: AdvertisingConfig) {
        self.control.lock().advertising.set_config(config);
    }

    pub fn set_discovery_mode(&self, mode: DiscoveryMode) {
        self.control.lock().advertising.set_discovery_mode(mode);
    }

    pub fn set_connection_mode(&self, mode: ConnectionMode) {
        self.control.lock().advertising.set_connection_mode(mode);
    }

    pub fn set_advertising_interval(&self, min: u32, max: u32) {
        self.control.lock().advertising.set_interval(min, max);
    }

    pub fn set_advertising_duration(&self, duration: u16) {
        self.control.lock().advertising.set_duration(duration);
    }

    pub fn set_advertising_max_events(&self, max_events: u8) {
        self.control.lock().advertising.set_max_events(max_events);
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    pub fn enable_log(&self, enabled: bool) {
        self.log.set_enabled(enabled);
    }

    pub fn is_log_enabled(&self) -> bool {
        self.log.is_enabled()
    }

    pub fn set_log_tag(&self, tag: &str) {
        self.log.set_tag(tag);
    }

    pub fn log_tag(&self) -> String {
        self.log.tag()
    }

    /// Log one line per registered connection
    pub fn print_connections(&self) {
        let control = self.control.lock();
        spp_log!(
            self.log,
            info,
            "{} of {} connections",
            control.registry.count(),
            control.registry.capacity()
        );
        control.registry.for_each(|record| {
            spp_log!(self.log, info, "{}", record);
        });
    }

    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.control.lock().registry.iter().copied().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.control.lock().registry.count()
    }

    pub fn max_connections(&self) -> usize {
        self.control.lock().registry.capacity()
    }

    pub fn state(&self) -> SessionState {
        self.control.lock().state
    }

    pub fn is_advertising(&self) -> bool {
        self.control.lock().advertising.is_advertising()
    }

    pub fn is_stack_booted(&self) -> bool {
        self.control.lock().stack_booted
    }
}
