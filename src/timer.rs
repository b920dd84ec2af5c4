//! One-shot timer backed by a dedicated expiry thread.
//!
//! The expiry callback runs on the timer thread while the timer state lock is
//! held, so [`OneShotTimer::cancel`] returning means no callback is running
//! or will run for the cancelled deadline.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use embassy_time::{Duration, Instant};

use crate::error::Result;

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<TimerState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Re-armable one-shot timer.
#[derive(Debug)]
pub struct OneShotTimer {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    /// Start the expiry thread. `on_expiry` must return promptly.
    pub fn spawn(on_expiry: impl Fn() + Send + 'static) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let thread = thread::Builder::new()
            .name("ledc-timer".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run(&shared, &on_expiry)
            })?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Fire once after `after`, replacing any pending deadline.
    pub fn arm(&self, after: Duration) {
        let deadline = Instant::now().checked_add(after).unwrap_or(Instant::MAX);
        self.shared.lock().deadline = Some(deadline);
        self.shared.changed.notify_one();
    }

    /// Disarm, waiting for an in-flight expiry callback to finish.
    pub fn cancel(&self) {
        self.shared.lock().deadline = None;
        self.shared.changed.notify_one();
    }

    pub fn is_armed(&self) -> bool {
        self.shared.lock().deadline.is_some()
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.deadline = None;
            state.shutdown = true;
        }
        self.shared.changed.notify_one();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(shared: &Shared, on_expiry: &dyn Fn()) {
    let mut state = shared.lock();
    while !state.shutdown {
        let Some(deadline) = state.deadline else {
            state = shared
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let now = Instant::now();
        if now >= deadline {
            state.deadline = None;
            on_expiry();
            continue;
        }

        let remaining = core::time::Duration::from_micros((deadline - now).as_micros());
        state = shared
            .changed
            .wait_timeout(state, remaining)
            .map(|(state, _)| state)
            .unwrap_or_else(|poisoned| poisoned.into_inner().0);
    }
}
