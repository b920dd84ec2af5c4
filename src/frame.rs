//! Frame type and its text codec
//!
//! One frame is one line of text: every line value followed by a comma,
//! then the hold duration and a newline.
//!
//! ```text
//! 1,0,-1,5\n
//! ```

use core::fmt::Write as _;
use core::str;

use embassy_time::Duration;
use heapless::{String, Vec};

use crate::error::{Error, Result};

/// Maximum number of output lines a frame can address.
pub const MAX_LINES: usize = 32;

/// Widest serialized frame: `MAX_LINES` times `-128,` plus `4294967295\n`.
pub const MAX_LINE_LEN: usize = MAX_LINES * 5 + 11;

/// Field separator.
pub const SEPARATOR: u8 = b',';

/// Line terminator.
pub const TERMINATOR: u8 = b'\n';

/// Rendered text of a single frame.
pub type FrameText = String<MAX_LINE_LEN>;

/// One step of the sequence: a value per output line and a hold duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    values: Vec<i8, MAX_LINES>,
    duration: u32,
    encoded_size: usize,
}

impl Frame {
    /// Create a frame from raw values.
    pub fn new(values: &[i8], duration: u32) -> Result<Self> {
        if duration == 0 {
            return Err(Error::InvalidArgument("duration must be at least 1"));
        }
        let values =
            Vec::from_slice(values).map_err(|()| Error::InvalidArgument("too many line values"))?;
        let mut frame = Self {
            values,
            duration,
            encoded_size: 0,
        };
        frame.encoded_size = frame.serialize().len();
        Ok(frame)
    }

    /// Parse one line (without its terminator) for a bank of `line_count` lines.
    ///
    /// The line must hold exactly `line_count` signed 8-bit values followed by
    /// an unsigned 32-bit duration of at least 1, all comma separated.
    pub fn parse(line: &[u8], line_count: usize) -> Result<Self> {
        let text = str::from_utf8(line).map_err(|_| Error::InvalidArgument("line is not text"))?;

        let mut values: Vec<i8, MAX_LINES> = Vec::new();
        let mut fields = text.split(SEPARATOR as char);
        for _ in 0..line_count {
            let field = fields
                .next()
                .ok_or(Error::InvalidArgument("missing line value"))?;
            let value = field
                .parse::<i8>()
                .map_err(|_| Error::InvalidArgument("line value is not an 8-bit integer"))?;
            values
                .push(value)
                .map_err(|_| Error::InvalidArgument("too many line values"))?;
        }

        let duration = fields
            .next()
            .ok_or(Error::InvalidArgument("missing duration"))?
            .parse::<u32>()
            .map_err(|_| Error::InvalidArgument("duration is not a 32-bit integer"))?;
        if fields.next().is_some() {
            return Err(Error::InvalidArgument("too many fields"));
        }

        Self::new(&values, duration)
    }

    /// Render the frame as one terminated line.
    pub fn serialize(&self) -> FrameText {
        let mut text = FrameText::new();
        let mut fits = true;
        for value in &self.values {
            fits &= write!(text, "{},", value).is_ok();
        }
        fits &= writeln!(text, "{}", self.duration).is_ok();
        debug_assert!(fits, "frame text longer than MAX_LINE_LEN");
        text
    }

    /// Per-line values, in line order.
    pub fn values(&self) -> &[i8] {
        &self.values
    }

    /// Hold duration in wire time units.
    pub const fn duration(&self) -> u32 {
        self.duration
    }

    /// Length of [`Frame::serialize`] output, terminator included.
    pub const fn encoded_size(&self) -> usize {
        self.encoded_size
    }

    /// Real hold time for a given time unit.
    pub fn hold(&self, time_unit: Duration) -> Duration {
        Duration::from_ticks(time_unit.as_ticks().saturating_mul(u64::from(self.duration)))
    }
}
