//! Fixed-capacity receive window.

use std::io;

use crate::transport::{Transport, is_would_block};

/// Outcome of one [`ReceiveBuffer::fill_from`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `n` new bytes were appended.
    Read(usize),
    WouldBlock,
    /// The peer closed its side.
    Closed,
    /// No free space even after compaction.
    ///
    /// The line tokenizer and the body reader consume everything they
    /// scan, so a connection only sees this while its own output is
    /// blocked. Request memory is bounded by the line and header caps.
    Full,
}

/// Byte window of fixed capacity with a processed and an unused cursor.
///
/// Bytes in `[..processed]` are consumed and may be discarded, bytes in
/// `[processed..unused]` are waiting to be parsed, `[unused..]` is free.
/// `processed <= unused <= capacity` always holds.
#[derive(Debug)]
pub struct ReceiveBuffer {
    data: Box<[u8]>,
    processed: usize,
    unused: usize,
}

impl ReceiveBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            processed: 0,
            unused: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn unused(&self) -> usize {
        self.unused
    }

    /// Bytes received but not consumed yet.
    pub fn pending(&self) -> usize {
        self.unused - self.processed
    }

    pub fn unprocessed(&self) -> &[u8] {
        &self.data[self.processed..self.unused]
    }

    /// Mark `n` pending bytes as consumed.
    ///
    /// # Panics
    ///
    /// If `n` exceeds [`pending`](Self::pending).
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.pending(), "consumed past the unused cursor");
        self.processed += n;
    }

    /// Copy pending bytes into `dst` and consume them.
    pub fn take(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.pending());
        dst[..n].copy_from_slice(&self.data[self.processed..self.processed + n]);
        self.processed += n;
        n
    }

    /// Append up to `limit` pending bytes to `dst` and consume them.
    pub fn take_into(&mut self, dst: &mut Vec<u8>, limit: usize) -> usize {
        let n = limit.min(self.pending());
        dst.extend_from_slice(&self.data[self.processed..self.processed + n]);
        self.processed += n;
        n
    }

    /// Drop everything, consumed or not.
    pub fn clear(&mut self) {
        self.processed = 0;
        self.unused = 0;
    }

    /// Move pending bytes to the front. Returns whether space was freed.
    pub fn compact(&mut self) -> bool {
        if self.processed == 0 {
            return false;
        }
        if self.processed == self.unused {
            self.clear();
            return true;
        }

        self.data.copy_within(self.processed..self.unused, 0);
        self.unused -= self.processed;
        self.processed = 0;
        true
    }

    /// One non-blocking read from `transport` into the free tail.
    pub fn fill_from<T>(&mut self, transport: &mut T) -> io::Result<Fill>
    where
        T: Transport + ?Sized,
    {
        if self.processed == self.unused {
            self.clear();
        } else if self.unused == self.capacity() && !self.compact() {
            return Ok(Fill::Full);
        }

        match transport.read(&mut self.data[self.unused..]) {
            Ok(0) => Ok(Fill::Closed),
            Ok(n) => {
                self.unused += n;
                Ok(Fill::Read(n))
            }
            Err(e) if is_would_block(&e) => Ok(Fill::WouldBlock),
            Err(e) => Err(e),
        }
    }
}
