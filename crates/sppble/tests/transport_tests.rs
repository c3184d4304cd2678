//! Integration tests for the serial-port transport against the mock link stack

use std::sync::{Arc, Mutex};

use sppble::{
    ConnectionId, NotifyTarget, SessionState, SppConfig, SppError, SppTransport,
};
use sppble_core::protocol::SPP_DATA_CHARACTERISTIC_UUID;
use sppble_core::{AttributeHandle, AttributeUuid, LinkEvent, LinkStack, ServiceSpec};
use sppble_harness::{events, LinkCall, LinkOp, MockLinkConfig, MockLinkStack, Notification};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

fn booted(max_connections: usize) -> (Arc<MockLinkStack>, SppTransport) {
    let link = Arc::new(MockLinkStack::with_max_connections(max_connections));
    let transport = SppTransport::new(link.clone());
    transport.handle_event(&events::boot()).unwrap();
    (link, transport)
}

fn started(max_connections: usize) -> (Arc<MockLinkStack>, SppTransport) {
    let (link, transport) = booted(max_connections);
    transport.start("motor").unwrap();
    (link, transport)
}

fn data_handle(link: &MockLinkStack) -> AttributeHandle {
    link.characteristic_handle(AttributeUuid::Long(SPP_DATA_CHARACTERISTIC_UUID))
        .expect("data characteristic registered")
}

fn commit_count(link: &MockLinkStack) -> usize {
    link.calls()
        .iter()
        .filter(|call| matches!(call, LinkCall::GattCommit(_)))
        .count()
}

// ----------------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------------

#[test]
fn test_start_before_boot_defers_advertising() {
    let link = Arc::new(MockLinkStack::new());
    let transport = SppTransport::new(link.clone());

    transport.start("motor").unwrap();
    assert_eq!(transport.state(), SessionState::AwaitingStackBoot);
    assert_eq!(link.advertising_started_count(), 0);
    assert_eq!(commit_count(&link), 1);

    transport.handle_event(&events::boot()).unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
    assert_eq!(link.advertising_started_count(), 1);
    assert!(transport.is_advertising());
}

#[test]
fn test_start_after_boot_advertises_immediately() {
    let (link, transport) = started(4);
    assert!(transport.is_stack_booted());
    assert_eq!(transport.state(), SessionState::Idle);
    assert_eq!(link.advertising_started_count(), 1);
    assert_eq!(link.live_advertising_sets(), 1);
}

#[test]
fn test_start_is_idempotent() {
    let (link, transport) = started(4);
    transport.start("other").unwrap();

    assert_eq!(link.services_added(), 2);
    assert_eq!(commit_count(&link), 1);
    assert_eq!(link.advertising_started_count(), 1);
    assert_eq!(transport.device_name(), "motor");
}

#[test]
fn test_restart_reuses_gatt_database() {
    let (link, transport) = started(4);
    transport.end().unwrap();
    assert_eq!(transport.state(), SessionState::NotStarted);

    transport.start("motor").unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
    assert_eq!(link.services_added(), 2);
    assert_eq!(commit_count(&link), 1);
    assert_eq!(link.advertising_started_count(), 2);
}

#[test]
fn test_bootstrap_failure_is_fatal() {
    let (link, transport) = booted(4);
    link.fail(LinkOp::GattCommit);

    let err = transport.start("motor").unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, SppError::Bootstrap { step: "commit", .. }));
    assert_eq!(transport.state(), SessionState::NotStarted);
    assert_eq!(link.advertising_started_count(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let link = Arc::new(MockLinkStack::new());
    let result = SppTransport::with_config(link, SppConfig::new().with_mtu(0));
    assert!(matches!(result, Err(SppError::Config { .. })));
}

// ----------------------------------------------------------------------------
// Connections and Re-advertising
// ----------------------------------------------------------------------------

#[test]
fn test_readvertising_policy_with_two_slots() {
    let (link, transport) = started(2);
    assert_eq!(link.advertising_started_count(), 1);

    transport.handle_event(&events::connection_opened(1)).unwrap();
    assert_eq!(transport.state(), SessionState::Active);
    assert_eq!(link.advertising_started_count(), 2);
    assert!(transport.is_advertising());

    transport.handle_event(&events::connection_opened(2)).unwrap();
    assert_eq!(transport.state(), SessionState::Active);
    assert_eq!(link.advertising_started_count(), 2);
    assert!(!transport.is_advertising());

    transport.handle_event(&events::connection_closed(2)).unwrap();
    assert_eq!(transport.state(), SessionState::Active);
    assert_eq!(link.advertising_started_count(), 3);

    transport.handle_event(&events::connection_closed(1)).unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
    assert_eq!(link.advertising_started_count(), 3);
    assert_eq!(transport.connection_count(), 0);
}

#[test]
fn test_connection_rejected_when_registry_full() {
    let (_link, transport) = started(1);
    transport.handle_event(&events::connection_opened(1)).unwrap();

    let err = transport
        .handle_event(&events::connection_opened(2))
        .unwrap_err();
    assert!(matches!(err, SppError::RegistryFull { capacity: 1 }));
    assert_eq!(transport.connection_count(), 1);
    assert_eq!(transport.connections()[0].connection, ConnectionId(1));
}

#[test]
fn test_connection_records() {
    let (_link, transport) = started(4);
    transport.handle_event(&events::connection_opened(3)).unwrap();

    let records = transport.connections();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_master);
    assert_eq!(
        records[0].to_string(),
        "conn:0x03 bonding:0xFF slave addr:C0:42:00:00:00:03"
    );
    transport.print_connections();
}

#[test]
fn test_unknown_close_is_harmless() {
    let (_link, transport) = started(4);
    transport.handle_event(&events::connection_closed(9)).unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
}

#[test]
fn test_duplicate_connection_is_not_reported_as_full() {
    let (_link, transport) = started(4);
    transport.handle_event(&events::connection_opened(1)).unwrap();

    let err = transport
        .handle_event(&events::connection_opened(1))
        .unwrap_err();
    assert!(matches!(
        err,
        SppError::DuplicateConnection {
            connection: ConnectionId(1)
        }
    ));
    assert_eq!(transport.connection_count(), 1);
}

#[test]
fn test_connection_before_start_is_not_registered() {
    let (link, transport) = booted(4);
    let opened = Arc::new(Mutex::new(Vec::new()));
    let sink = opened.clone();
    transport.on_connect(move |id| sink.lock().unwrap().push(id));

    transport.handle_event(&events::connection_opened(1)).unwrap();
    assert_eq!(transport.state(), SessionState::NotStarted);
    assert_eq!(transport.connection_count(), 0);
    assert!(opened.lock().unwrap().is_empty());

    transport.start("motor").unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
    assert_eq!(link.services_added(), 2);
    assert_eq!(link.advertising_started_count(), 1);
}

#[test]
fn test_connection_while_awaiting_boot_is_not_registered() {
    let link = Arc::new(MockLinkStack::new());
    let transport = SppTransport::new(link.clone());
    transport.start("motor").unwrap();

    transport.handle_event(&events::connection_opened(1)).unwrap();
    assert_eq!(transport.state(), SessionState::AwaitingStackBoot);
    assert_eq!(transport.connection_count(), 0);

    transport.handle_event(&events::boot()).unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
    assert_eq!(link.advertising_started_count(), 1);
}

#[test]
fn test_readvertise_failure_on_open_still_tracks_connection() {
    let (link, transport) = started(2);
    let opened = Arc::new(Mutex::new(Vec::new()));
    let sink = opened.clone();
    transport.on_connect(move |id| sink.lock().unwrap().push(id));
    link.fail(LinkOp::StartAdvertising);

    let err = transport
        .handle_event(&events::connection_opened(1))
        .unwrap_err();
    assert!(matches!(err, SppError::Advertising { .. }));
    assert_eq!(transport.state(), SessionState::Active);
    assert_eq!(transport.connection_count(), 1);
    assert!(!transport.is_advertising());
    assert_eq!(*opened.lock().unwrap(), vec![ConnectionId(1)]);
}

#[test]
fn test_readvertise_failure_on_close_still_tracks_connection() {
    let (link, transport) = started(3);
    transport.handle_event(&events::connection_opened(1)).unwrap();
    transport.handle_event(&events::connection_opened(2)).unwrap();
    link.fail(LinkOp::StartAdvertising);

    let err = transport
        .handle_event(&events::connection_closed(2))
        .unwrap_err();
    assert!(matches!(err, SppError::Advertising { .. }));
    assert_eq!(transport.connection_count(), 1);
    assert_eq!(transport.state(), SessionState::Active);

    link.recover(LinkOp::StartAdvertising);
    transport.handle_event(&events::connection_closed(1)).unwrap();
    assert_eq!(transport.state(), SessionState::Idle);
}

// ----------------------------------------------------------------------------
// Teardown
// ----------------------------------------------------------------------------

#[test]
fn test_end_closes_everything_and_clears_queues() {
    let (link, transport) = started(4);
    transport.handle_event(&events::connection_opened(1)).unwrap();
    transport.write(&[1, 2, 3]);
    transport
        .handle_event(&events::attribute_write(data_handle(&link), &[7, 8]))
        .unwrap();

    transport.end().unwrap();

    assert_eq!(transport.state(), SessionState::NotStarted);
    assert_eq!(transport.connection_count(), 0);
    assert_eq!(transport.available(), 0);
    assert_eq!(transport.flush(), 0);
    assert!(!transport.is_advertising());
    assert_eq!(link.closed_connections(), vec![ConnectionId(1)]);
    assert_eq!(link.live_advertising_sets(), 0);
}

#[test]
fn test_end_failure_leaves_state_untouched() {
    let (link, transport) = started(4);
    transport.handle_event(&events::connection_opened(1)).unwrap();
    transport.handle_event(&events::connection_opened(2)).unwrap();
    transport.write(&[5]);
    link.fail_close(ConnectionId(2));

    let err = transport.end().unwrap_err();
    assert!(matches!(
        err,
        SppError::TeardownFailed {
            connection: ConnectionId(2),
            ..
        }
    ));
    assert_eq!(transport.state(), SessionState::Active);
    assert_eq!(transport.connection_count(), 2);
    assert_eq!(transport.flush(), 1);
}

// ----------------------------------------------------------------------------
// Data Path
// ----------------------------------------------------------------------------

#[test]
fn test_small_write_waits_for_explicit_flush() {
    let (link, transport) = started(4);
    transport.handle_event(&events::connection_opened(1)).unwrap();

    assert_eq!(transport.write(&[1, 2, 3]), 3);
    assert!(link.notifications().is_empty());

    assert_eq!(transport.flush(), 3);
    assert_eq!(
        link.notifications(),
        vec![Notification {
            target: NotifyTarget::All,
            attribute: data_handle(&link),
            data: vec![1, 2, 3],
        }]
    );
}

#[test]
fn test_default_policy_flushes_when_full() {
    let (link, transport) = started(4);
    let data: Vec<u8> = (0..600u32).map(|i| i as u8).collect();

    assert_eq!(transport.write(&data), 600);
    assert_eq!(link.notifications().len(), 1);
    assert_eq!(link.notified_bytes(), data[..250].to_vec());

    assert_eq!(transport.flush(), 250);
    assert_eq!(transport.flush(), 100);
    assert_eq!(transport.flush(), 0);
    assert_eq!(link.notified_bytes(), data);
}

#[test]
fn test_overflow_with_never_firing_condition() {
    let (link, transport) = started(4);
    transport.set_send_condition(|_, _| false);

    let data: Vec<u8> = (0..512u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(transport.write(&data), 512);
    assert!(link.notifications().is_empty());

    assert_eq!(transport.write(&[0xAA]), 0);
    assert_eq!(link.notifications().len(), 1);
    assert_eq!(link.notified_bytes(), data[..250].to_vec());
}

#[test]
fn test_condition_sees_index_then_length() {
    let (link, transport) = started(4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    transport.set_send_condition(move |index, buf| {
        recorder.lock().unwrap().push(index);
        index == buf.len()
    });

    assert_eq!(transport.write(b"hello"), 5);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(link.notified_bytes(), b"hello".to_vec());
}

#[test]
fn test_condition_flushes_mid_write() {
    let (link, transport) = started(4);
    transport.set_send_condition(|index, _| index % 4 == 3);

    assert_eq!(transport.write(&[1, 2, 3, 4, 5, 6, 7, 8]), 8);
    let chunks: Vec<Vec<u8>> = link.notifications().into_iter().map(|n| n.data).collect();
    assert_eq!(chunks, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
}

#[test]
fn test_flush_to_single_connection() {
    let (link, transport) = started(4);
    transport.write_byte(0x42);
    let target = NotifyTarget::Connection(ConnectionId(1));

    assert_eq!(transport.flush_to(target), 1);
    assert_eq!(link.notifications()[0].target, target);
}

#[test]
fn test_failed_notify_reports_zero() {
    let (link, transport) = started(4);
    link.fail(LinkOp::NotifyAll);
    transport.write(&[1, 2]);
    assert_eq!(transport.flush(), 0);
}

#[test]
fn test_send_message_bypasses_queue() {
    let (link, transport) = started(4);
    transport.write(&[9]);
    let target = NotifyTarget::Connection(ConnectionId(2));

    assert_eq!(transport.send_message(target, "ping"), 4);
    assert_eq!(link.notified_bytes(), b"ping".to_vec());
    assert_eq!(transport.send_data(NotifyTarget::All, &[]), 0);
    assert_eq!(transport.flush(), 1);
}

#[test]
fn test_inbound_from_data_characteristic() {
    let (link, transport) = started(4);
    transport
        .handle_event(&events::attribute_write(data_handle(&link), b"abc"))
        .unwrap();

    assert_eq!(transport.available(), 3);
    assert_eq!(transport.peek(), Some(b'a'));
    assert_eq!(transport.available(), 3);
    assert_eq!(transport.read(), Some(b'a'));
    assert_eq!(transport.read(), Some(b'b'));
    assert_eq!(transport.read(), Some(b'c'));
    assert_eq!(transport.read(), None);
    assert_eq!(transport.peek(), None);
}

#[test]
fn test_write_to_other_attribute_ignored() {
    let (link, transport) = started(4);
    let other = AttributeHandle(data_handle(&link).0 + 100);
    transport
        .handle_event(&events::attribute_write(other, &[1, 2]))
        .unwrap();
    assert_eq!(transport.available(), 0);
}

#[test]
fn test_inbound_overflow_truncates() {
    let (link, transport) = started(4);
    let handle = data_handle(&link);
    transport
        .handle_event(&events::attribute_write(handle, &[0x11; 600]))
        .unwrap();
    assert_eq!(transport.available(), 512);

    transport
        .handle_event(&events::attribute_write(handle, &[0x22]))
        .unwrap();
    assert_eq!(transport.available(), 512);
    assert_eq!(transport.read(), Some(0x11));
}

// ----------------------------------------------------------------------------
// Naming and Advertising Parameters
// ----------------------------------------------------------------------------

#[test]
fn test_device_name_gets_address_suffix() {
    let (link, transport) = started(4);
    assert_eq!(transport.full_device_name(), "motor_123456");

    let initial = link.calls().into_iter().find_map(|call| match call {
        LinkCall::GattAddCharacteristic(_, spec, _) if spec.uuid == AttributeUuid::Short(0x2A00) => {
            Some(spec.initial_value)
        }
        _ => None,
    });
    assert_eq!(initial, Some(b"motor_123456".to_vec()));
}

#[test]
fn test_device_name_without_suffix() {
    let link = Arc::new(MockLinkStack::new());
    let config = SppConfig::new().with_name_shows_identifier(false);
    let transport = SppTransport::with_config(link.clone(), config).unwrap();
    transport.start("pump").unwrap();
    assert_eq!(transport.full_device_name(), "pump");
}

#[test]
fn test_rename_after_start_updates_characteristic() {
    let (link, transport) = started(4);
    transport.set_device_name("pump");

    let writes = link.attribute_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1, b"pump".to_vec());
    assert_eq!(transport.device_name(), "pump");
}

#[test]
fn test_rename_failure_is_not_fatal() {
    let (link, transport) = started(4);
    link.fail(LinkOp::WriteAttribute);
    transport.set_device_name("pump");
    assert_eq!(transport.device_name(), "pump");
    assert_eq!(transport.state(), SessionState::Idle);
}

#[test]
fn test_rename_before_start_only_stores() {
    let link = Arc::new(MockLinkStack::with_config(
        MockLinkConfig::default().with_identity(sppble::BdAddr::new([0x0c, 0x1d, 0x2e, 0, 0, 0])),
    ));
    let transport = SppTransport::new(link.clone());
    transport.set_device_name("drive");
    assert!(link.attribute_writes().is_empty());

    transport.start("drive").unwrap();
    assert_eq!(transport.full_device_name(), "drive_2e1d0c");
}

#[test]
fn test_advertising_parameters_applied_on_configure() {
    let (link, transport) = booted(4);
    transport.set_advertising_interval(320, 400);
    transport.set_advertising_duration(500);
    transport.start("motor").unwrap();

    let timing = link.calls().into_iter().find_map(|call| match call {
        LinkCall::SetAdvertisingTiming(_, config) => Some(config),
        _ => None,
    });
    let timing = timing.expect("timing applied");
    assert_eq!(timing.interval_min, 320);
    assert_eq!(timing.interval_max, 400);
    assert_eq!(timing.duration, 500);
    assert_eq!(transport.advertising_config(), timing);
}

// ----------------------------------------------------------------------------
// Hooks and Diagnostics
// ----------------------------------------------------------------------------

#[test]
fn test_connection_hooks_fire_after_state_update() {
    let (_link, transport) = started(4);
    let transport = Arc::new(transport);
    let log = Arc::new(Mutex::new(Vec::new()));

    let (observer, seen) = (transport.clone(), log.clone());
    transport.on_connect(move |id| {
        seen.lock()
            .unwrap()
            .push(format!("open {} count={}", id, observer.connection_count()));
    });
    let seen = log.clone();
    transport.on_disconnect(move |id| seen.lock().unwrap().push(format!("close {}", id)));

    transport.handle_event(&events::connection_opened(1)).unwrap();
    transport.handle_event(&events::connection_closed(1)).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["open 0x01 count=1".to_string(), "close 0x01".to_string()]
    );
}

#[test]
fn test_raw_hook_sees_every_event_and_can_be_replaced() {
    let (_link, transport) = started(4);
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    let sink = first.clone();
    transport.on_raw_event(move |event| sink.lock().unwrap().push(event.kind()));
    transport.handle_event(&LinkEvent::Other { id: 0x20 }).unwrap();

    let sink = second.clone();
    transport.on_raw_event(move |event| sink.lock().unwrap().push(event.kind()));
    transport.handle_event(&events::connection_opened(1)).unwrap();

    assert_eq!(*first.lock().unwrap(), vec!["Other"]);
    assert_eq!(*second.lock().unwrap(), vec!["ConnectionOpened"]);
}

#[test]
fn test_gatt_hook_runs_before_commit() {
    let (link, transport) = booted(4);
    transport.on_gatt_db_init(|stack: &dyn LinkStack, session| {
        let spec = ServiceSpec {
            uuid: AttributeUuid::Short(0x180A),
            primary: true,
            advertised: false,
        };
        stack.gattdb_add_service(session, &spec).unwrap();
    });
    transport.start("motor").unwrap();

    let calls = link.calls();
    let hook_service = calls
        .iter()
        .position(|call| {
            matches!(call, LinkCall::GattAddService(spec, _) if spec.uuid == AttributeUuid::Short(0x180A))
        })
        .expect("hook added its service");
    let commit = calls
        .iter()
        .position(|call| matches!(call, LinkCall::GattCommit(_)))
        .expect("database committed");
    assert!(hook_service < commit);
    assert_eq!(link.services_added(), 3);
}

#[test]
fn test_logging_controls() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (_link, transport) = started(4);
    assert!(!transport.is_log_enabled());
    transport.enable_log(true);
    transport.set_log_tag("[drive] ");
    assert!(transport.is_log_enabled());
    assert_eq!(transport.log_tag(), "[drive] ");

    transport.handle_event(&events::connection_opened(1)).unwrap();
    transport.print_connections();
    transport.write(&[0u8; 600]);
    transport.enable_log(false);
    assert!(!transport.is_log_enabled());
}
