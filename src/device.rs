//! Byte-stream surface of the sequencer.
//!
//! Writers append frame lines, readers get the serialized sequence back, and
//! opening for truncation resets playback and drops every frame.

use std::io;
use std::sync::Arc;

use crate::config::SequencerConfig;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::output::{LineBank, OutputRegistry};
use crate::partial::{PartialBuffer, PartialLines};
use crate::scheduler::Scheduler;
use crate::store::{FrameStore, SequenceWriter};

/// How a [`DeviceFile`] is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read the serialized sequence
    Read,
    /// Append frames to the existing sequence
    Append,
    /// Reset playback, drop every frame, then write
    Truncate,
}

impl OpenMode {
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Append | Self::Truncate)
    }
}

/// The sequencer: frame store, playback scheduler and output lines.
///
/// Dropping it stops the worker (outputs end low) before the frames are
/// released.
pub struct StreamDevice<B: LineBank + 'static> {
    // Declared first so the worker stops before anything else is dropped.
    scheduler: Scheduler,
    partial: PartialBuffer,
    store: Arc<FrameStore>,
    outputs: Arc<OutputRegistry<B>>,
}

impl<B: LineBank + 'static> StreamDevice<B> {
    /// Create the device and start its worker in the waiting state.
    pub fn new(bank: B, config: &SequencerConfig) -> Result<Self> {
        let store = Arc::new(FrameStore::new(config.line_count)?);
        let outputs = Arc::new(OutputRegistry::new(bank, config.line_count)?);
        let scheduler = Scheduler::spawn(
            Arc::clone(&store),
            Arc::clone(&outputs),
            config.time_unit,
        )?;
        Ok(Self {
            scheduler,
            partial: PartialBuffer::new(),
            store,
            outputs,
        })
    }

    /// Open a handle. [`OpenMode::Truncate`] stops playback and clears the
    /// sequence; bytes of an unfinished line written earlier are kept.
    pub fn open(&self, mode: OpenMode) -> Result<DeviceFile<'_, B>> {
        if mode == OpenMode::Truncate {
            self.scheduler.reset();
            self.store.clear()?;
            tracing::debug!("sequence truncated");
        }
        Ok(DeviceFile {
            device: self,
            mode,
            offset: 0,
        })
    }

    /// Copy serialized frames starting at byte `offset`. Returns 0 at the end
    /// of the sequence.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(self.store.read_window(offset, buf)?.copied)
    }

    /// Accept raw bytes and append every complete, valid frame line.
    ///
    /// Returns the number of bytes taken into the line buffer, which is all of
    /// `data`. A malformed line is dropped and reported as
    /// [`Error::InvalidArgument`]; frames appended before it in the same call
    /// stay queued and complete lines after it wait for the next write.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if !self.outputs.is_ready() {
            return Err(Error::Unready);
        }

        let mut partial = self.partial.lock()?;
        let (started, drained) = {
            // Both locks are taken before any byte is buffered, so a failed
            // lock leaves nothing behind for the retry to duplicate.
            let mut sequence = self.store.writer()?;
            partial.append(data)?;
            let was_empty = sequence.is_empty();
            let drained = drain_lines(&mut partial, &mut sequence);
            (was_empty && !sequence.is_empty(), drained)
        };
        if started {
            self.scheduler.kick();
        }

        let appended = drained?;
        if appended > 0 {
            tracing::debug!(appended, "frames appended");
        }
        Ok(data.len())
    }

    /// Change the number of output lines. Fails with [`Error::Busy`] while
    /// frames are queued.
    pub fn set_line_count(&self, line_count: u8) -> Result<()> {
        self.store.reconfigure(|current| {
            self.outputs.resize(line_count)?;
            *current = line_count;
            Ok(())
        })?;
        tracing::debug!(line_count, "output line count changed");
        Ok(())
    }

    pub fn line_count(&self) -> usize {
        self.outputs.line_count()
    }

    /// Bind output slot `index` to hardware line `id` (`None` unbinds).
    /// Fails with [`Error::Busy`] while frames are queued.
    pub fn set_line_id(&self, index: usize, id: Option<u16>) -> Result<()> {
        self.store
            .reconfigure(|_| self.outputs.assign(index, id))?;
        tracing::debug!(index, ?id, "output line assigned");
        Ok(())
    }

    pub fn line_id(&self, index: usize) -> Option<u16> {
        self.outputs.line_id(index)
    }

    /// True once every output slot is bound.
    pub fn is_ready(&self) -> bool {
        self.outputs.is_ready()
    }

    pub fn frame_count(&self) -> Result<usize> {
        self.store.len()
    }

    /// Snapshot of the queued frames.
    pub fn frames(&self) -> Result<Vec<Frame>> {
        self.store.frames()
    }

    /// Bytes written but not yet terminated by a newline.
    pub fn pending_bytes(&self) -> Result<Vec<u8>> {
        self.partial.pending()
    }

    /// True while a frame is being held on the outputs.
    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }
}

/// Parse and append every complete line. Blank lines are skipped.
///
/// A malformed line is consumed. A line whose frame cannot be stored stays
/// buffered for the next write.
fn drain_lines(partial: &mut PartialLines<'_>, sequence: &mut SequenceWriter<'_>) -> Result<usize> {
    let line_count = sequence.line_count();
    let mut appended = 0;
    while let Some(line) = partial.peek_line() {
        if line.is_empty() {
            partial.consume_line();
            continue;
        }
        let frame = Frame::parse(line, line_count);
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                partial.consume_line();
                return Err(err);
            }
        };
        sequence.push(frame)?;
        partial.consume_line();
        appended += 1;
    }
    Ok(appended)
}

/// An open handle on a [`StreamDevice`]. Closing is dropping it.
pub struct DeviceFile<'a, B: LineBank + 'static> {
    device: &'a StreamDevice<B>,
    mode: OpenMode,
    offset: u64,
}

impl<B: LineBank + 'static> DeviceFile<'_, B> {
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Current read offset.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }
}

impl<B: LineBank + 'static> io::Read for DeviceFile<'_, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let copied = self.device.read_at(self.offset, buf)?;
        self.offset += copied as u64;
        Ok(copied)
    }
}

impl<B: LineBank + 'static> io::Write for DeviceFile<'_, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.mode.is_write() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle not opened for writing",
            ));
        }
        Ok(self.device.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
