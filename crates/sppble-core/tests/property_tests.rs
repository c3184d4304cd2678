//! Property-based tests for the connection registry and byte queue
//!
//! These verify the capacity invariants under arbitrary operation sequences:
//! the registry never exceeds its bound and a rejected add leaves it
//! unchanged; the queue keeps `0 <= len <= capacity` and returns exactly the
//! admitted bytes in order.

use std::collections::VecDeque;

use proptest::prelude::*;
use sppble_core::{BdAddr, BondingHandle, ByteQueue, ConnectionId, ConnectionRecord, ConnectionRegistry};

#[derive(Debug, Clone)]
enum RegistryOp {
    Add(u8),
    Remove(u8),
}

fn arb_registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        (0u8..8).prop_map(RegistryOp::Add),
        (0u8..8).prop_map(RegistryOp::Remove),
    ]
}

#[derive(Debug, Clone)]
enum QueueOp {
    Push(Vec<u8>),
    Pop(usize),
}

fn arb_queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..40).prop_map(QueueOp::Push),
        (0usize..40).prop_map(QueueOp::Pop),
    ]
}

fn record(id: u8) -> ConnectionRecord {
    ConnectionRecord::peripheral(ConnectionId(id), BondingHandle::NONE, BdAddr::new([id; 6]))
}

proptest! {
    /// Property: registry size never exceeds capacity and failed adds do not mutate
    #[test]
    fn registry_respects_capacity(
        capacity in 1usize..5,
        ops in prop::collection::vec(arb_registry_op(), 0..64),
    ) {
        let mut registry = ConnectionRegistry::new(capacity);

        for op in ops {
            match op {
                RegistryOp::Add(id) => {
                    let before: Vec<ConnectionRecord> = registry.iter().copied().collect();
                    let accepted = registry.add(record(id));
                    if accepted {
                        prop_assert!(before.len() < capacity);
                        prop_assert!(!before.iter().any(|r| r.connection.raw() == id));
                    } else {
                        let after: Vec<ConnectionRecord> = registry.iter().copied().collect();
                        prop_assert_eq!(before, after);
                    }
                }
                RegistryOp::Remove(id) => {
                    registry.remove(ConnectionId(id));
                    prop_assert!(!registry.contains(ConnectionId(id)));
                }
            }
            prop_assert!(registry.count() <= capacity);
        }
    }

    /// Property: queue occupancy stays in bounds and bytes come out in order
    #[test]
    fn queue_is_bounded_fifo(
        capacity in 1usize..64,
        ops in prop::collection::vec(arb_queue_op(), 0..64),
    ) {
        let mut queue = ByteQueue::new(capacity);
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                QueueOp::Push(bytes) => {
                    let admitted = queue.push_slice(&bytes);
                    prop_assert_eq!(admitted, bytes.len().min(capacity - model.len()));
                    model.extend(bytes[..admitted].iter().copied());
                }
                QueueOp::Pop(n) => {
                    let mut out = vec![0u8; n];
                    let got = queue.drain_into(&mut out);
                    let expected: Vec<u8> = (0..got).filter_map(|_| model.pop_front()).collect();
                    prop_assert_eq!(&out[..got], expected.as_slice());
                }
            }
            prop_assert!(queue.len() <= queue.capacity());
            prop_assert_eq!(queue.len(), model.len());
        }
    }
}
