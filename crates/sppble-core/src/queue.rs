//! Fixed-capacity circular byte queue
//!
//! The queue itself is not synchronized; the transport pairs each instance
//! with exactly one lock. A full queue refuses further bytes instead of
//! overwriting the oldest ones.

// ----------------------------------------------------------------------------
// Byte Queue
// ----------------------------------------------------------------------------

/// FIFO ring of bytes with a capacity fixed at construction
#[derive(Debug, Clone)]
pub struct ByteQueue {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl ByteQueue {
    /// Create an empty queue holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    pub fn free(&self) -> usize {
        self.buf.len() - self.len
    }

    /// Append one byte; returns `false` without mutating when full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = (self.head + self.len) % self.buf.len();
        self.buf[tail] = byte;
        self.len += 1;
        true
    }

    /// Append as many bytes as fit, returning how many were stored
    pub fn push_slice(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.free());
        for &b in &bytes[..n] {
            self.push(b);
        }
        n
    }

    /// Remove and return the oldest byte
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.head];
        self.head = (self.head + 1) % self.buf.len();
        self.len -= 1;
        Some(byte)
    }

    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buf[self.head])
        }
    }

    /// Move up to `out.len()` bytes into `out`, returning the count
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.pop() {
                Some(b) => {
                    out[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
