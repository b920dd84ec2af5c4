//! Ordered frame sequence with a playback cursor.
//!
//! Frames live in an append-only arena; head is index 0 and tail is the last
//! index, so following `next` is `index + 1`. The only removal is a full
//! clear. The cursor is kept outside the lock because the scheduler worker
//! advances it while holding shared access; `clear` resets it under
//! exclusive access, which the lock serializes against the worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::frame::{Frame, MAX_LINES};

const NO_CURSOR: usize = usize::MAX;

#[derive(Debug)]
struct Sequence {
    frames: Vec<Frame>,
    line_count: u8,
}

/// Result of a [`FrameStore::read_window`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Bytes copied into the caller's buffer
    pub copied: usize,
    /// Offset to continue reading from
    pub next_offset: u64,
    /// Index of the last frame that contributed bytes
    pub frame: Option<usize>,
}

/// The shared frame sequence.
#[derive(Debug)]
pub struct FrameStore {
    sequence: RwLock<Sequence>,
    cursor: AtomicUsize,
}

impl FrameStore {
    /// Create an empty store for `line_count` output lines.
    pub fn new(line_count: u8) -> Result<Self> {
        if usize::from(line_count) > MAX_LINES {
            return Err(Error::InvalidArgument("line count out of range"));
        }
        Ok(Self {
            sequence: RwLock::new(Sequence {
                frames: Vec::new(),
                line_count,
            }),
            cursor: AtomicUsize::new(NO_CURSOR),
        })
    }

    fn shared(&self) -> Result<RwLockReadGuard<'_, Sequence>> {
        self.sequence.read().map_err(|_| {
            self.sequence.clear_poison();
            Error::Interrupted
        })
    }

    fn exclusive(&self) -> Result<RwLockWriteGuard<'_, Sequence>> {
        self.sequence.write().map_err(|_| {
            self.sequence.clear_poison();
            Error::Interrupted
        })
    }

    /// Exclusive access for appending several frames in one pass.
    pub fn writer(&self) -> Result<SequenceWriter<'_>> {
        Ok(SequenceWriter {
            sequence: self.exclusive()?,
        })
    }

    /// Attach one frame at the tail.
    pub fn append(&self, frame: Frame) -> Result<()> {
        self.writer()?.push(frame)
    }

    /// Drop every frame and forget the playback position.
    pub fn clear(&self) -> Result<()> {
        let mut sequence = self.exclusive()?;
        sequence.frames = Vec::new();
        self.cursor.store(NO_CURSOR, Ordering::Relaxed);
        Ok(())
    }

    /// Run a structural change that is only allowed while the store is empty.
    ///
    /// The closure receives the line count and runs under exclusive access,
    /// so no frame can be appended between the emptiness check and the change.
    pub fn reconfigure<R>(&self, change: impl FnOnce(&mut u8) -> Result<R>) -> Result<R> {
        let mut sequence = self.exclusive()?;
        if !sequence.frames.is_empty() {
            return Err(Error::Busy);
        }
        change(&mut sequence.line_count)
    }

    /// Copy serialized frames starting at byte `offset` into `buf`.
    ///
    /// Frames are rendered lazily; only those overlapping the requested
    /// range are serialized. Never moves the playback cursor.
    pub fn read_window(&self, offset: u64, buf: &mut [u8]) -> Result<Window> {
        let sequence = self.shared()?;

        let mut window = Window {
            copied: 0,
            next_offset: offset,
            frame: None,
        };
        let mut frame_start = 0u64;
        for (index, frame) in sequence.frames.iter().enumerate() {
            if window.copied == buf.len() {
                break;
            }
            let frame_end = frame_start.saturating_add(frame.encoded_size() as u64);
            if window.next_offset < frame_end {
                let text = frame.serialize();
                let skip = usize::try_from(window.next_offset - frame_start).unwrap_or(0);
                let chunk = text.as_bytes().get(skip..).unwrap_or_default();
                let count = chunk.len().min(buf.len() - window.copied);
                buf[window.copied..window.copied + count].copy_from_slice(&chunk[..count]);
                window.copied += count;
                window.next_offset += count as u64;
                window.frame = Some(index);
            }
            frame_start = frame_end;
        }

        Ok(window)
    }

    /// Advance the cursor, wrapping from tail to head, and return the frame
    /// it now points to. Returns `None` for an empty store.
    ///
    /// Only the scheduler worker may call this.
    pub fn step_cursor(&self) -> Result<Option<Frame>> {
        let sequence = self.shared()?;
        let Some(tail) = sequence.frames.len().checked_sub(1) else {
            return Ok(None);
        };
        let next = match self.cursor.load(Ordering::Relaxed) {
            NO_CURSOR => 0,
            current if current >= tail => 0,
            current => current + 1,
        };
        self.cursor.store(next, Ordering::Relaxed);
        Ok(sequence.frames.get(next).cloned())
    }

    /// Index of the frame last returned by [`FrameStore::step_cursor`].
    pub fn cursor(&self) -> Option<usize> {
        match self.cursor.load(Ordering::Relaxed) {
            NO_CURSOR => None,
            index => Some(index),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.shared()?.frames.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.shared()?.frames.is_empty())
    }

    /// Line count every queued frame was parsed against.
    pub fn line_count(&self) -> Result<u8> {
        Ok(self.shared()?.line_count)
    }

    /// Snapshot of the queued frames.
    pub fn frames(&self) -> Result<Vec<Frame>> {
        Ok(self.shared()?.frames.clone())
    }
}

/// Exclusive view used by the write path to append parsed frames.
#[derive(Debug)]
pub struct SequenceWriter<'a> {
    sequence: RwLockWriteGuard<'a, Sequence>,
}

impl SequenceWriter<'_> {
    pub fn line_count(&self) -> usize {
        usize::from(self.sequence.line_count)
    }

    /// Append at the tail. The frame must match the configured line count.
    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if frame.values().len() != self.line_count() {
            return Err(Error::InvalidArgument("frame does not match line count"));
        }
        self.sequence
            .frames
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory)?;
        self.sequence.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sequence.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.frames.is_empty()
    }
}
