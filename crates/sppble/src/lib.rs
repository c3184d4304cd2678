//! Serial-port stream transport over Bluetooth Low Energy
//!
//! This crate exposes a byte-oriented stream (read, write, peek, flush) on
//! top of a single GATT characteristic: peers write into it without response
//! and the device answers with notifications.
//!
//! ## Architecture
//!
//! - [`stream`] - the inbound and outbound byte queues and the flush policy
//! - [`session`] - the lifecycle state machine gating the stream
//! - [`advertising`] - the advertising set and its parameters
//! - [`bootstrap`] - one-time construction of the GATT database
//! - [`transport`] - [`SppTransport`], which owns all of the above
//! - `dispatcher` - routing of [`LinkEvent`]s into the transport
//!
//! The Bluetooth stack itself is injected as an implementation of
//! [`LinkStack`](sppble_core::LinkStack).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sppble::{LinkEvent, SppTransport};
//! # fn link() -> Arc<dyn sppble::LinkStack> { unimplemented!() }
//! # fn next_event() -> LinkEvent { unimplemented!() }
//!
//! # fn example() -> sppble::Result<()> {
//! let transport = Arc::new(SppTransport::new(link()));
//! transport.start("motor")?;
//!
//! // event pump, usually on its own thread
//! transport.handle_event(&next_event())?;
//!
//! transport.write(b"hello");
//! transport.flush();
//! while let Some(byte) = transport.read() {
//!     println!("{byte:02x}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod advertising;
pub mod bootstrap;
mod dispatcher;
pub mod hooks;
pub mod logging;
pub mod session;
pub mod stream;
pub mod transport;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use advertising::AdvertisingController;
pub use bootstrap::{GattDescriptor, ServiceHandles};
pub use logging::LogSettings;
pub use session::{SessionEffect, SessionEvent, SessionState, SessionTransition};
pub use stream::{LockMode, SppStream};
pub use transport::SppTransport;

pub use sppble_core::{
    AdvertisingConfig, BdAddr, ConnectionId, ConnectionMode, ConnectionRecord, DiscoveryMode,
    LinkError, LinkEvent, LinkStack, NotifyTarget, Result, SppConfig, SppError,
};
