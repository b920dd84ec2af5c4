//! Output line registry
//!
//! Each logical slot can be bound to one hardware line id. The sequencer only
//! needs to drive a boolean level to a bound line; claiming and releasing the
//! hardware is the job of a [`LineBank`] implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::Vec;

use crate::error::{Error, Result};
use crate::frame::MAX_LINES;

/// A claimed hardware output. Released when dropped.
pub trait OutputLine: Send {
    /// Drive the line high or low
    fn drive(&mut self, high: bool) -> Result<()>;
}

/// Source of hardware output lines.
///
/// Implement this trait to support different hardware platforms.
pub trait LineBank: Send {
    type Line: OutputLine;

    /// Claim the line with hardware id `id`
    fn claim(&mut self, id: u16) -> Result<Self::Line>;
}

#[derive(Debug)]
struct Slot<L> {
    id: u16,
    line: L,
}

struct Lines<B: LineBank> {
    bank: B,
    slots: Vec<Option<Slot<B::Line>>, MAX_LINES>,
}

/// Fixed-capacity table of output slots.
pub struct OutputRegistry<B: LineBank> {
    inner: Mutex<Lines<B>>,
}

impl<B: LineBank> OutputRegistry<B> {
    /// Create a registry with `line_count` unassigned slots.
    pub fn new(bank: B, line_count: u8) -> Result<Self> {
        let mut slots = Vec::new();
        resize_slots(&mut slots, line_count)?;
        Ok(Self {
            inner: Mutex::new(Lines { bank, slots }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Lines<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn line_count(&self) -> usize {
        self.lock().slots.len()
    }

    /// Hardware id bound to slot `index`, if any.
    pub fn line_id(&self, index: usize) -> Option<u16> {
        self.lock()
            .slots
            .get(index)
            .and_then(|slot| slot.as_ref().map(|slot| slot.id))
    }

    /// True when there is at least one slot and every slot is bound.
    pub fn is_ready(&self) -> bool {
        let lines = self.lock();
        !lines.slots.is_empty() && lines.slots.iter().all(Option::is_some)
    }

    /// Grow or shrink the slot table. Removed slots release their lines.
    pub fn resize(&self, line_count: u8) -> Result<()> {
        resize_slots(&mut self.lock().slots, line_count)
    }

    /// Bind slot `index` to hardware id `id`, or unbind it with `None`.
    ///
    /// The new line is claimed before the old one is released, so a failed
    /// claim leaves the slot unchanged.
    pub fn assign(&self, index: usize, id: Option<u16>) -> Result<()> {
        let mut lines = self.lock();
        let Lines { bank, slots } = &mut *lines;
        let slot = slots
            .get_mut(index)
            .ok_or(Error::InvalidArgument("line index out of range"))?;

        match id {
            None => *slot = None,
            Some(id) if slot.as_ref().is_some_and(|current| current.id == id) => {}
            Some(id) => {
                let line = bank.claim(id)?;
                *slot = Some(Slot { id, line });
            }
        }
        Ok(())
    }

    /// Drive every bound slot to its value in `values` (non-zero is high).
    ///
    /// Unbound slots, values without a slot and driving failures are logged
    /// and skipped.
    pub fn drive(&self, values: &[i8]) {
        let mut lines = self.lock();
        if values.len() > lines.slots.len() {
            tracing::warn!(
                values = values.len(),
                lines = lines.slots.len(),
                "frame has more values than output lines"
            );
        }
        for (index, slot) in lines.slots.iter_mut().enumerate() {
            let Some(&value) = values.get(index) else {
                tracing::warn!(index, "no value for output line");
                continue;
            };
            let Some(slot) = slot else {
                tracing::warn!(index, "output line not assigned, skipped");
                continue;
            };
            if let Err(err) = slot.line.drive(value != 0) {
                tracing::warn!(index, id = slot.id, %err, "failed to drive output line");
            }
        }
    }

    /// Drive every bound slot low.
    pub fn all_off(&self) {
        let mut lines = self.lock();
        for (index, slot) in lines.slots.iter_mut().enumerate() {
            if let Some(slot) = slot {
                if let Err(err) = slot.line.drive(false) {
                    tracing::warn!(index, id = slot.id, %err, "failed to turn output line off");
                }
            }
        }
    }
}

fn resize_slots<L>(slots: &mut Vec<Option<L>, MAX_LINES>, line_count: u8) -> Result<()> {
    let line_count = usize::from(line_count);
    if line_count > MAX_LINES {
        return Err(Error::InvalidArgument("line count out of range"));
    }
    slots.truncate(line_count);
    while slots.len() < line_count {
        let _ = slots.push(None);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct VirtualState {
    levels: BTreeMap<u16, bool>,
    claimed: BTreeSet<u16>,
    faulty: BTreeSet<u16>,
    drives: usize,
}

/// In-memory line bank for hosts without real outputs.
///
/// Clones share the same line table, so one clone can observe the levels
/// driven through lines claimed from another.
#[derive(Debug, Clone, Default)]
pub struct VirtualLineBank {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualLineBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last level driven to line `id`, if it was ever claimed.
    pub fn level(&self, id: u16) -> Option<bool> {
        self.lock().levels.get(&id).copied()
    }

    /// Levels of several lines at once.
    pub fn levels(&self, ids: &[u16]) -> std::vec::Vec<Option<bool>> {
        let state = self.lock();
        ids.iter().map(|id| state.levels.get(id).copied()).collect()
    }

    pub fn is_claimed(&self, id: u16) -> bool {
        self.lock().claimed.contains(&id)
    }

    /// Make every drive of line `id` fail (or succeed again).
    pub fn set_faulty(&self, id: u16, faulty: bool) {
        let mut state = self.lock();
        if faulty {
            state.faulty.insert(id);
        } else {
            state.faulty.remove(&id);
        }
    }

    /// Number of successful drives across all lines.
    pub fn drive_count(&self) -> usize {
        self.lock().drives
    }
}

impl LineBank for VirtualLineBank {
    type Line = VirtualLine;

    fn claim(&mut self, id: u16) -> Result<VirtualLine> {
        let mut state = self.lock();
        if !state.claimed.insert(id) {
            return Err(Error::Busy);
        }
        state.levels.insert(id, false);
        Ok(VirtualLine {
            id,
            state: Arc::clone(&self.state),
        })
    }
}

/// Line handed out by [`VirtualLineBank`].
#[derive(Debug)]
pub struct VirtualLine {
    id: u16,
    state: Arc<Mutex<VirtualState>>,
}

impl OutputLine for VirtualLine {
    fn drive(&mut self, high: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.faulty.contains(&self.id) {
            return Err(io::Error::other("line fault").into());
        }
        state.levels.insert(self.id, high);
        state.drives += 1;
        Ok(())
    }
}

impl Drop for VirtualLine {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.claimed.remove(&self.id);
    }
}
