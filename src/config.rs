use embassy_time::Duration;

/// Default length of one wire time unit.
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Configuration for the sequencer device
#[derive(Debug, Clone, Copy)]
pub struct SequencerConfig {
    /// Number of output lines at startup. Zero leaves the device unready.
    pub line_count: u8,
    /// Real time represented by one unit of a frame's duration field
    pub time_unit: Duration,
}

impl SequencerConfig {
    pub const fn new() -> Self {
        Self {
            line_count: 0,
            time_unit: DEFAULT_TIME_UNIT,
        }
    }

    #[must_use]
    pub const fn with_line_count(mut self, line_count: u8) -> Self {
        self.line_count = line_count;
        self
    }

    #[must_use]
    pub const fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::new()
    }
}
