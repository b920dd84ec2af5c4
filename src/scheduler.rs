//! Playback scheduler
//!
//! A dedicated worker thread walks the frame store, one frame per `Step`
//! signal, and is the only context that touches the output lines. The timer
//! thread only posts `Step` when a frame's hold time runs out.
//!
//! ```text
//!            Step (timer / bootstrap)
//!   waiting ---------------------------> drive frame, arm timer --+
//!      ^  ^                                                        |
//!      |  +--------------------------------------------------------+
//!      |        Reset
//!      +------ cancel timer, all off (Step again if frames were written since)
//!              Exit
//!   waiting ---------> cancel timer, all off, thread ends
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use embassy_time::Duration;

use crate::error::Result;
use crate::output::{LineBank, OutputRegistry};
use crate::signal::{Signal, SignalSlot};
use crate::store::FrameStore;
use crate::timer::OneShotTimer;

/// Handle to the running worker and its timer.
///
/// Dropping the scheduler stops playback, zeroes the outputs and joins
/// both threads.
pub struct Scheduler {
    signals: Arc<SignalSlot>,
    timer: Arc<OneShotTimer>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the timer and worker threads in the waiting state.
    pub fn spawn<B>(
        store: Arc<FrameStore>,
        outputs: Arc<OutputRegistry<B>>,
        time_unit: Duration,
    ) -> Result<Self>
    where
        B: LineBank + 'static,
    {
        let signals = Arc::new(SignalSlot::new());
        let timer = Arc::new(OneShotTimer::spawn({
            let signals = Arc::clone(&signals);
            move || signals.post(Signal::Step)
        })?);

        let player = Player {
            store,
            outputs,
            signals: Arc::clone(&signals),
            timer: Arc::clone(&timer),
            time_unit,
        };
        let worker = thread::Builder::new()
            .name("ledc-player".into())
            .spawn(move || player.run())?;

        Ok(Self {
            signals,
            timer,
            worker: Some(worker),
        })
    }

    /// Start playback if no frame is currently being held.
    pub fn kick(&self) {
        if !self.timer.is_armed() {
            tracing::debug!("starting playback");
            self.signals.post(Signal::Step);
        }
    }

    /// Stop playback and zero the outputs; the worker keeps waiting.
    pub fn reset(&self) {
        self.timer.cancel();
        self.signals.post(Signal::Reset);
    }

    /// True while a frame hold timer is armed.
    pub fn is_playing(&self) -> bool {
        self.timer.is_armed()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.timer.cancel();
        self.signals.post(Signal::Exit);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("player thread panicked");
            }
        }
    }
}

/// State owned by the worker thread.
struct Player<B: LineBank> {
    store: Arc<FrameStore>,
    outputs: Arc<OutputRegistry<B>>,
    signals: Arc<SignalSlot>,
    timer: Arc<OneShotTimer>,
    time_unit: Duration,
}

impl<B: LineBank> Player<B> {
    fn run(self) {
        self.signals.attach(thread::current());
        loop {
            match self.signals.wait() {
                Signal::Step => self.step(),
                Signal::Reset => self.reset(),
                Signal::Exit => {
                    tracing::debug!("player exiting");
                    self.timer.cancel();
                    self.outputs.all_off();
                    return;
                }
                Signal::None => {}
            }
        }
    }

    fn reset(&self) {
        tracing::debug!("playback reset");
        // A step that was in flight when the reset was requested may have
        // re-armed the timer after the caller cancelled it.
        self.timer.cancel();
        self.outputs.all_off();
        // Frames written after the truncate may have skipped their start
        // while that deadline was armed.
        if matches!(self.store.is_empty(), Ok(false)) {
            self.signals.post(Signal::Step);
        }
    }

    fn step(&self) {
        match self.store.step_cursor() {
            Ok(Some(frame)) => {
                self.outputs.drive(frame.values());
                self.timer.arm(frame.hold(self.time_unit));
            }
            Ok(None) => {
                tracing::warn!("no frames to play, playback paused");
                self.outputs.all_off();
            }
            Err(err) => {
                tracing::warn!(%err, "failed to advance, retrying");
                self.timer.arm(self.time_unit);
            }
        }
    }
}
