//! Timed frame sequencer for banks of binary LED output lines.
//!
//! Frames are appended as text lines (`v0,v1,...,duration\n`) through a
//! [`StreamDevice`]; a worker thread plays them back in a loop, holding each
//! frame on the output lines for its duration.

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod output;
pub mod partial;
pub mod relay;
pub mod scheduler;
pub mod signal;
pub mod store;
pub mod timer;

pub use config::SequencerConfig;
pub use device::{DeviceFile, OpenMode, StreamDevice};
pub use error::{Error, Result};
pub use frame::{Frame, MAX_LINE_LEN, MAX_LINES};
pub use output::{LineBank, OutputLine, OutputRegistry, VirtualLineBank};
pub use scheduler::Scheduler;
pub use store::FrameStore;

pub use embassy_time::{Duration, Instant};
