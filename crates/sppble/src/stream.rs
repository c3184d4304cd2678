//! Buffered byte stream over the data characteristic
//!
//! Two bounded queues sit between the application and the link: inbound
//! bytes come from peer writes, outbound bytes leave as notifications in
//! chunks of at most one MTU. Each queue has its own lock and the two are
//! never held together. An atomic mirror of each queue's length serves the
//! lock-free fast paths (`available`, the full-check at write entry).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use sppble_core::{AttributeHandle, ByteQueue, LinkStack, NotifyTarget};

use crate::hooks::SendCondition;
use crate::logging::{spp_log, LogSettings};

/// How `transfer_outgoing` acquires the outbound lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Block until the lock is free
    Locked,
    /// Try once; give up if another thread holds it
    Emergency,
}

type Chunk = SmallVec<[u8; 256]>;

pub struct SppStream {
    link: Arc<dyn LinkStack>,
    log: Arc<LogSettings>,
    mtu: usize,
    inbound: Mutex<ByteQueue>,
    outbound: Mutex<ByteQueue>,
    inbound_len: AtomicUsize,
    outbound_len: AtomicUsize,
    inbound_capacity: usize,
    outbound_capacity: usize,
    data_channel: OnceLock<AttributeHandle>,
    send_condition: RwLock<Option<SendCondition>>,
}

impl SppStream {
    pub fn new(
        link: Arc<dyn LinkStack>,
        log: Arc<LogSettings>,
        queue_capacity: usize,
        mtu: usize,
    ) -> Self {
        Self {
            link,
            log,
            mtu,
            inbound: Mutex::new(ByteQueue::new(queue_capacity)),
            outbound: Mutex::new(ByteQueue::new(queue_capacity)),
            inbound_len: AtomicUsize::new(0),
            outbound_len: AtomicUsize::new(0),
            inbound_capacity: queue_capacity,
            outbound_capacity: queue_capacity,
            data_channel: OnceLock::new(),
            send_condition: RwLock::new(None),
        }
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn data_channel(&self) -> Option<AttributeHandle> {
        self.data_channel.get().copied()
    }

    /// Record the data characteristic handle; the first binding wins
    pub fn bind_data_channel(&self, handle: AttributeHandle) {
        let _ = self.data_channel.set(handle);
    }

    pub fn set_send_condition(&self, condition: SendCondition) {
        *self.send_condition.write() = Some(condition);
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound_len.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------------

    /// Bytes waiting to be read
    pub fn available(&self) -> usize {
        self.inbound_len.load(Ordering::Acquire)
    }

    pub fn read(&self) -> Option<u8> {
        let mut inbound = self.inbound.lock();
        let byte = inbound.pop();
        self.inbound_len.store(inbound.len(), Ordering::Release);
        byte
    }

    /// Next byte without consuming it
    ///
    /// Gives up instead of waiting when another thread holds the inbound
    /// lock, so `None` does not mean the queue is empty: check `available`.
    pub fn peek(&self) -> Option<u8> {
        self.inbound.try_lock().and_then(|inbound| inbound.peek())
    }

    /// Queue a peer write; returns how many bytes were admitted
    pub fn admit_inbound(&self, payload: &[u8]) -> usize {
        if payload.is_empty() {
            return 0;
        }
        if self.inbound_len.load(Ordering::Acquire) >= self.inbound_capacity {
            spp_log!(self.log, warn, "Rx buffer overflow! dropped {} bytes", payload.len());
            return 0;
        }

        let admitted = {
            let mut inbound = self.inbound.lock();
            let admitted = inbound.push_slice(payload);
            self.inbound_len.store(inbound.len(), Ordering::Release);
            admitted
        };

        if admitted < payload.len() {
            spp_log!(
                self.log,
                warn,
                "Rx buffer overflow! dropped {} of {} bytes",
                payload.len() - admitted,
                payload.len()
            );
        }
        admitted
    }

    // ------------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------------

    pub fn write_byte(&self, byte: u8) -> usize {
        self.write(&[byte])
    }

    /// Queue bytes for notification, flushing according to the send policy
    ///
    /// Without a send condition a flush happens whenever the queue fills.
    /// With one, the condition is consulted after every queued byte with the
    /// byte's index, and once more with the full length after the loop.
    /// Returns the number of bytes accepted, or 0 when the queue overflowed.
    pub fn write(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }
        if self.outbound_len.load(Ordering::Acquire) >= self.outbound_capacity {
            spp_log!(self.log, warn, "Tx buffer overflow!");
            self.transfer_outgoing(NotifyTarget::All, LockMode::Emergency);
            return 0;
        }

        let condition = self.send_condition.read().clone();
        let mut outbound = self.outbound.lock();

        for (index, &byte) in bytes.iter().enumerate() {
            if !outbound.push(byte) {
                drop(outbound);
                spp_log!(self.log, warn, "Tx buffer overflow!");
                self.transfer_outgoing(NotifyTarget::All, LockMode::Emergency);
                return 0;
            }
            self.outbound_len.store(outbound.len(), Ordering::Release);

            let due = match &condition {
                Some(condition) => condition(index, bytes),
                None => outbound.is_full(),
            };
            if due {
                drop(outbound);
                self.transfer_outgoing(NotifyTarget::All, LockMode::Locked);
                outbound = self.outbound.lock();
            }
        }
        drop(outbound);

        let due = match &condition {
            Some(condition) => condition(bytes.len(), bytes),
            None => self.outbound_len() >= self.outbound_capacity,
        };
        if due {
            self.transfer_outgoing(NotifyTarget::All, LockMode::Locked);
        }
        bytes.len()
    }

    /// Notify every connection with up to one MTU of queued bytes
    pub fn flush(&self) -> usize {
        self.transfer_outgoing(NotifyTarget::All, LockMode::Locked)
    }

    pub fn flush_to(&self, target: NotifyTarget) -> usize {
        self.transfer_outgoing(target, LockMode::Locked)
    }

    /// Drain up to one MTU from the outbound queue and notify `target`
    ///
    /// Bytes stay queued until the data characteristic exists. Returns the
    /// number of bytes the link accepted; drained bytes are gone even when
    /// the notification fails.
    pub fn transfer_outgoing(&self, target: NotifyTarget, mode: LockMode) -> usize {
        let Some(attribute) = self.data_channel() else {
            spp_log!(self.log, debug, "flush skipped: data characteristic not registered");
            return 0;
        };

        let mut chunk: Chunk = SmallVec::from_elem(0, self.mtu);
        let drained = match mode {
            LockMode::Locked => {
                let mut outbound = self.outbound.lock();
                self.drain_locked(&mut outbound, &mut chunk)
            }
            LockMode::Emergency => match self.outbound.try_lock() {
                Some(mut outbound) => self.drain_locked(&mut outbound, &mut chunk),
                None => {
                    spp_log!(self.log, debug, "emergency drain skipped: tx queue busy");
                    return 0;
                }
            },
        };

        if drained == 0 {
            return 0;
        }
        self.notify(target, attribute, &chunk[..drained])
    }

    fn drain_locked(&self, outbound: &mut ByteQueue, chunk: &mut Chunk) -> usize {
        let drained = outbound.drain_into(chunk);
        self.outbound_len.store(outbound.len(), Ordering::Release);
        drained
    }

    /// Send `data` directly, bypassing the outbound queue
    ///
    /// Payloads longer than the MTU go out as consecutive notifications.
    /// Stops at the first rejected chunk; returns the bytes sent.
    pub fn send_data(&self, target: NotifyTarget, data: &[u8]) -> usize {
        let Some(attribute) = self.data_channel() else {
            spp_log!(self.log, warn, "send skipped: data characteristic not registered");
            return 0;
        };

        let mut sent = 0;
        for chunk in data.chunks(self.mtu) {
            let n = self.notify(target, attribute, chunk);
            sent += n;
            if n < chunk.len() {
                break;
            }
        }
        sent
    }

    fn notify(&self, target: NotifyTarget, attribute: AttributeHandle, data: &[u8]) -> usize {
        let result = match target {
            NotifyTarget::All => self.link.notify_all(attribute, data),
            NotifyTarget::Connection(connection) => self.link.notify(connection, attribute, data),
        };
        match result {
            Ok(()) => data.len(),
            Err(e) => {
                spp_log!(self.log, warn, "notify to 0x{:02X} failed: {}", target.raw(), e);
                0
            }
        }
    }

    /// Discard everything in both queues
    pub fn clear(&self) {
        {
            let mut outbound = self.outbound.lock();
            outbound.clear();
            self.outbound_len.store(0, Ordering::Release);
        }
        let mut inbound = self.inbound.lock();
        inbound.clear();
        self.inbound_len.store(0, Ordering::Release);
    }
}
