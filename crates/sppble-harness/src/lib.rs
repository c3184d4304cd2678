//! Test harness for the BLE serial-port transport
//!
//! Provides [`MockLinkStack`], a recording fake of the link stack, and
//! builders for the events a real stack would deliver.

pub mod events;
pub mod mock_link;

pub use mock_link::{LinkCall, LinkOp, MockLinkConfig, MockLinkStack, Notification};
