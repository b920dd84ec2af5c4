//! Holding area for written bytes that do not yet form a complete line.

use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::frame::TERMINATOR;

/// Byte accumulator shared by all writers, guarded by its own lock.
#[derive(Debug, Default)]
pub struct PartialBuffer {
    inner: Mutex<Vec<u8>>,
}

impl PartialBuffer {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Take exclusive access for one accumulate-and-drain pass.
    ///
    /// A lock left poisoned by a panicking writer is reported as
    /// [`Error::Interrupted`]; the next attempt proceeds with the bytes it left.
    pub fn lock(&self) -> Result<PartialLines<'_>> {
        match self.inner.lock() {
            Ok(bytes) => Ok(PartialLines { bytes }),
            Err(_) => {
                self.inner.clear_poison();
                Err(Error::Interrupted)
            }
        }
    }

    /// Copy of the bytes still waiting for a terminator.
    pub fn pending(&self) -> Result<Vec<u8>> {
        Ok(self.lock()?.bytes.clone())
    }
}

/// Locked view of a [`PartialBuffer`].
#[derive(Debug)]
pub struct PartialLines<'a> {
    bytes: MutexGuard<'a, Vec<u8>>,
}

impl PartialLines<'_> {
    /// Append everything in `data`, returning the new buffered length.
    ///
    /// On allocation failure the buffer is left as it was.
    pub fn append(&mut self, data: &[u8]) -> Result<usize> {
        self.bytes
            .try_reserve(data.len())
            .map_err(|_| Error::OutOfMemory)?;
        self.bytes.extend_from_slice(data);
        Ok(self.bytes.len())
    }

    /// The next complete line, terminator stripped, or `None` when no
    /// terminator is buffered. The line stays until [`Self::consume_line`].
    pub fn peek_line(&self) -> Option<&[u8]> {
        let end = self.line_end()?;
        Some(&self.bytes[..end])
    }

    /// Drop the line [`Self::peek_line`] returns. Returns false when there is
    /// no complete line.
    pub fn consume_line(&mut self) -> bool {
        let Some(end) = self.line_end() else {
            return false;
        };
        self.bytes.drain(..=end);
        true
    }

    fn line_end(&self) -> Option<usize> {
        self.bytes.iter().position(|&byte| byte == TERMINATOR)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
