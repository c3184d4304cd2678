//! Serial-port service identifiers and sizing constants

use uuid::Uuid;

// ----------------------------------------------------------------------------
// Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Private serial-port service
pub const SPP_SERVICE_UUID: Uuid = Uuid::from_u128(0x4880c12c_fdcb_4077_8920_a450d7f9b907);

/// Data characteristic: peers write without response, we notify
pub const SPP_DATA_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xfec26ec4_6d71_4442_9f81_55bc21d658d6);

/// Generic Access service (16-bit SIG UUID)
pub const GENERIC_ACCESS_SERVICE_UUID: u16 = 0x1800;

/// Device Name characteristic (16-bit SIG UUID)
pub const DEVICE_NAME_CHARACTERISTIC_UUID: u16 = 0x2A00;

// ----------------------------------------------------------------------------
// Sizing
// ----------------------------------------------------------------------------

/// Largest payload sent in one notification
pub const DEFAULT_MTU: usize = 250;

/// Capacity of each of the inbound and outbound byte queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Upper bound on the generated device name
pub const MAX_DEVICE_NAME_LEN: usize = 512;

/// Wire value of the "all connections" notify target
pub const NOTIFY_ALL_CONNECTIONS: u8 = 0xFF;

/// Build the advertised device name, optionally suffixed with the low three
/// bytes of the identity address
pub fn device_name_with_suffix(name: &str, identity: Option<&crate::BdAddr>) -> String {
    let mut full = match identity {
        Some(addr) => format!("{}_{}", name, addr.short_id()),
        None => name.to_string(),
    };
    if full.len() > MAX_DEVICE_NAME_LEN {
        let mut cut = MAX_DEVICE_NAME_LEN;
        while !full.is_char_boundary(cut) {
            cut -= 1;
        }
        full.truncate(cut);
    }
    full
}
