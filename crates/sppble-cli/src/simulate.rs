//! Scripted session against the simulated link stack

use std::sync::Arc;

use anyhow::{Context, Result};
use sppble::{NotifyTarget, SppConfig, SppTransport};
use sppble_core::protocol::SPP_DATA_CHARACTERISTIC_UUID;
use sppble_core::AttributeUuid;
use sppble_harness::{events, MockLinkStack};
use tracing::{info, warn};

/// Parameters of one simulated session
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub peers: u8,
    pub payload: String,
    pub inbound: String,
}

/// What the session produced, for printing
#[derive(Debug, Default)]
pub struct Report {
    pub device_name: String,
    pub connected: usize,
    pub notifications: Vec<(NotifyTarget, Vec<u8>)>,
    pub received: Vec<u8>,
}

/// Boot, connect peers, exchange data in both directions and tear down
pub fn run(config: SppConfig, scenario: &Scenario) -> Result<Report> {
    let link = Arc::new(MockLinkStack::new());
    let transport = SppTransport::with_config(link.clone(), config)?;

    transport.on_connect(|id| info!("Peer connected on {}", id));
    transport.on_disconnect(|id| info!("Peer disconnected from {}", id));

    transport.handle_event(&events::boot())?;
    transport.start(&scenario.name)?;
    info!(
        "Advertising as {} ({})",
        transport.full_device_name(),
        transport.state()
    );

    for peer in 1..=scenario.peers {
        if let Err(e) = transport.handle_event(&events::connection_opened(peer)) {
            warn!("Peer {} not admitted: {}", peer, e);
        }
    }
    transport.print_connections();
    let connected = transport.connection_count();

    let queued = transport.write(scenario.payload.as_bytes());
    info!("Queued {} of {} payload bytes", queued, scenario.payload.len());
    while transport.flush() > 0 {}

    let data_channel = link
        .characteristic_handle(AttributeUuid::Long(SPP_DATA_CHARACTERISTIC_UUID))
        .context("data characteristic was not registered")?;
    transport.handle_event(&events::attribute_write(
        data_channel,
        scenario.inbound.as_bytes(),
    ))?;
    let received: Vec<u8> = std::iter::from_fn(|| transport.read()).collect();

    let report = Report {
        device_name: transport.full_device_name(),
        connected,
        notifications: link
            .notifications()
            .into_iter()
            .map(|n| (n.target, n.data))
            .collect(),
        received,
    };

    transport.end()?;
    for record in link.closed_connections() {
        transport.handle_event(&events::connection_closed(record.raw()))?;
    }
    info!("Session ended ({})", transport.state());
    Ok(report)
}
