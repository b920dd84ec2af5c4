//! Single-slot signal between the timer context and the scheduler worker.
//!
//! Built on `critical-section` like a one-element channel, except that posting
//! overwrites: the worker only ever sees the latest signal. `Exit` is sticky
//! and cannot be overwritten. Posting never blocks, which is what the timer
//! expiry context relies on.

use core::cell::Cell;
use std::sync::OnceLock;
use std::thread::Thread;

use critical_section::Mutex;

/// Events the scheduler worker reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Nothing pending
    None,
    /// Advance to the next frame
    Step,
    /// Zero the outputs and keep waiting
    Reset,
    /// Zero the outputs and terminate
    Exit,
}

/// Latest-wins signal slot with a wake handle for the worker thread.
pub struct SignalSlot {
    pending: Mutex<Cell<Signal>>,
    worker: OnceLock<Thread>,
}

impl SignalSlot {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(Signal::None)),
            worker: OnceLock::new(),
        }
    }

    /// Register the thread to unpark on [`SignalSlot::post`].
    pub fn attach(&self, worker: Thread) {
        let _ = self.worker.set(worker);
    }

    /// Publish `signal` and wake the worker.
    pub fn post(&self, signal: Signal) {
        critical_section::with(|cs| {
            let pending = self.pending.borrow(cs);
            if pending.get() != Signal::Exit {
                pending.set(signal);
            }
        });
        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
    }

    /// Take the pending signal, leaving `None` behind. `Exit` stays pending.
    pub fn take(&self) -> Signal {
        critical_section::with(|cs| {
            let pending = self.pending.borrow(cs);
            match pending.get() {
                Signal::Exit => Signal::Exit,
                _ => pending.replace(Signal::None),
            }
        })
    }

    /// Block the calling worker until a signal other than `None` is pending.
    pub fn wait(&self) -> Signal {
        loop {
            match self.take() {
                Signal::None => std::thread::park(),
                signal => return signal,
            }
        }
    }
}

impl Default for SignalSlot {
    fn default() -> Self {
        Self::new()
    }
}
