//! Network relay
//!
//! Forwards newline-terminated commands from TCP clients to a
//! [`StreamDevice`]:
//!
//! - `>[ message]\n` truncates the sequence and optionally writes one line
//! - `>> message\n` appends one line
//! - `<\n` streams the whole sequence back
//!
//! Any other command closes the connection.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crate::device::{OpenMode, StreamDevice};
use crate::error::{Error, Result};
use crate::frame::TERMINATOR;
use crate::output::LineBank;

/// Bytes requested from the socket per receive call.
pub const RECEIVE_CHUNK: usize = 256;

/// Receive and send timeout for client sockets. An idle client is dropped.
pub const CLIENT_TIMEOUT: core::time::Duration = core::time::Duration::from_secs(1);

/// Command state of one client connection.
pub struct Session<'a, B: LineBank + 'static> {
    device: &'a StreamDevice<B>,
    buffer: Vec<u8>,
}

impl<'a, B: LineBank + 'static> Session<'a, B> {
    pub const fn new(device: &'a StreamDevice<B>) -> Self {
        Self {
            device,
            buffer: Vec::new(),
        }
    }

    /// Serve `stream` until the peer disconnects or goes idle past its read
    /// timeout.
    pub fn run<S: Read + Write>(&mut self, stream: &mut S) -> Result<()> {
        let mut chunk = [0u8; RECEIVE_CHUNK];
        loop {
            let received = match stream.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("client disconnected");
                    return Ok(());
                }
                Ok(received) => received,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    tracing::debug!("client idle, closing");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            self.feed(&chunk[..received], stream)?;
        }
    }

    /// Buffer received bytes and execute every complete command.
    pub fn feed(&mut self, data: &[u8], reply: &mut impl Write) -> Result<()> {
        self.buffer
            .try_reserve(data.len())
            .map_err(|_| Error::OutOfMemory)?;
        self.buffer.extend_from_slice(data);

        while let Some(end) = self.buffer.iter().position(|&byte| byte == TERMINATOR) {
            let command: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some((&kind, message)) = command.split_first() {
                self.execute(kind, message, reply)?;
            }
        }
        Ok(())
    }

    /// Run one command: its first byte and the rest of the line, terminator
    /// included.
    fn execute(&self, kind: u8, message: &[u8], reply: &mut impl Write) -> Result<()> {
        match (kind, message) {
            (b'>', [b'>', message @ ..]) => self.forward(OpenMode::Append, message),
            (b'>', message) => self.forward(OpenMode::Truncate, message),
            (b'<', _) => self.send_sequence(reply),
            (other, _) => Err(Error::UnknownCommand(char::from(other))),
        }
    }

    fn forward(&self, mode: OpenMode, message: &[u8]) -> Result<()> {
        let start = message
            .iter()
            .position(|&byte| byte != b' ' && byte != b'\t')
            .unwrap_or(message.len());
        let message = &message[start..];

        let mut file = self.device.open(mode)?;
        if message.first().is_some_and(|&byte| byte != TERMINATOR) {
            file.write_all(message)?;
        }
        Ok(())
    }

    fn send_sequence(&self, reply: &mut impl Write) -> Result<()> {
        let mut file = self.device.open(OpenMode::Read)?;
        io::copy(&mut file, reply)?;
        reply.flush()?;
        Ok(())
    }
}

/// Accept clients forever, one thread per connection.
pub fn serve<B: LineBank + 'static>(
    listener: &TcpListener,
    device: &Arc<StreamDevice<B>>,
) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        tracing::info!(%peer, "client connected");

        let device = Arc::clone(device);
        thread::Builder::new()
            .name("ledc-client".into())
            .spawn(move || {
                if let Err(err) = handle_client(stream, &device) {
                    tracing::warn!(%peer, %err, "client session ended with error");
                }
            })?;
    }
}

fn handle_client<B: LineBank + 'static>(
    mut stream: TcpStream,
    device: &StreamDevice<B>,
) -> Result<()> {
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;
    Session::new(device).run(&mut stream)
}
