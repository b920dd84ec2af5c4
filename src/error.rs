//! Error taxonomy shared by the device, the scheduler and the relay.

use std::io;

use thiserror::Error;

/// Errors surfaced by sequencer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed field, wrong field count, zero duration or an
    /// out-of-range configuration value.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Structural change attempted while frames are queued.
    #[error("busy: frame sequence is not empty")]
    Busy,

    /// Write attempted before every output line is assigned.
    #[error("output lines are not configured")]
    Unready,

    /// Growing a buffer or the frame arena failed.
    #[error("out of memory")]
    OutOfMemory,

    /// A wait on a shared lock was interrupted; retry the call.
    #[error("interrupted while waiting for a lock")]
    Interrupted,

    /// Transport failure on a relay connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Relay client sent a command byte the protocol does not define.
    #[error("unknown relay command {0:?}")]
    UnknownCommand(char),
}

/// Result type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Error::Busy => io::ErrorKind::ResourceBusy,
            Error::Unready => io::ErrorKind::NotConnected,
            Error::OutOfMemory => io::ErrorKind::OutOfMemory,
            Error::Interrupted => io::ErrorKind::Interrupted,
            Error::Io(inner) => inner.kind(),
            Error::UnknownCommand(_) => io::ErrorKind::InvalidData,
        };
        match err {
            Error::Io(inner) => inner,
            other => io::Error::new(kind, other),
        }
    }
}
