//! Participants and their registration protocol
//!
//! A participant is any per-frame content source (a skeletal animation
//! player, a particle emitter) that writes into the shared buffers. The
//! manager never owns participants: it keeps a `Weak` reference behind a
//! generation-checked `MiddlewareHandle`. Owners must `unregister` before
//! dropping a participant; a participant that disappears anyway is detected
//! at dispatch and pruned.
//!
//! # Deferred add/remove
//!
//! ```text
//!               add_participant            flush               remove_participant           flush
//! Unregistered ---------------> PendingAdd ------> Active ----------------------> PendingRemove ------> Unregistered
//! ```
//!
//! Requests only land in the `pending` map. The manager runs
//! `flush_pending_operations` at the start of every `update`, and
//! `flush_pending_removals` at the start of every `render` so a removal never
//! waits a frame. Adds only ever join at `update`. Several requests for the
//! same participant between two flushes coalesce: the last one wins.

use crate::middleware::frame::FrameContext;
use indexmap::IndexMap;
use slotmap::SlotMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

slotmap::new_key_type! {
    /// Generation-checked handle to a registered participant
    pub struct MiddlewareHandle;
}

/// Per-frame update/render participant
///
/// Participants may queue add/remove requests through the `FrameContext`
/// while the manager iterates, including for themselves.
pub trait Middleware {
    /// Logic phase: advance animation state and write attachment/bone data
    /// into the shared streams
    fn update(&mut self, dt: f32, frame: &mut FrameContext<'_>);

    /// Render phase: fill vertex/index data into the mesh buffers
    fn render(&mut self, dt: f32, frame: &mut FrameContext<'_>);
}

/// Shared participant as held by its owner
pub type SharedMiddleware = Rc<RefCell<dyn Middleware>>;

/// Where a participant stands in the update list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    /// Not in the update list and nothing queued
    Unregistered,
    /// Queued to join the update list at the next flush
    PendingAdd,
    /// In the update list
    Active,
    /// Queued to leave the update list at the next flush
    PendingRemove,
}

/// Handle registry, active update list and pending intents
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    slots: SlotMap<MiddlewareHandle, Weak<RefCell<dyn Middleware>>>,
    active: Vec<MiddlewareHandle>,
    pending: IndexMap<MiddlewareHandle, bool>,
}

impl ParticipantRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a handle for a participant without taking ownership of it
    pub fn register(&mut self, participant: SharedMiddleware) -> MiddlewareHandle {
        self.slots.insert(Rc::downgrade(&participant))
    }

    /// Forget a participant immediately, including any queued intent.
    ///
    /// Returns `false` for a handle that is already gone.
    pub fn unregister(&mut self, handle: MiddlewareHandle) -> bool {
        if self.slots.remove(handle).is_none() {
            return false;
        }
        self.active.retain(|active| *active != handle);
        self.pending.shift_remove(&handle);
        true
    }

    /// Whether the handle still refers to a registered participant
    pub fn is_registered(&self, handle: MiddlewareHandle) -> bool {
        self.slots.contains_key(handle)
    }

    /// Queue an add (`true`) or remove (`false`) for the next flush.
    ///
    /// Overwrites any earlier intent for the same participant. Returns
    /// `false` and queues nothing for a stale handle.
    pub fn request(&mut self, handle: MiddlewareHandle, active: bool) -> bool {
        if !self.slots.contains_key(handle) {
            log::warn!("Ignoring update-list request for stale participant {:?}", handle);
            return false;
        }
        self.pending.insert(handle, active);
        true
    }

    /// Apply queued intents to the active list and clear them.
    ///
    /// New participants are appended in the order their first request of
    /// the frame arrived.
    pub fn flush_pending_operations(&mut self) {
        for (handle, want_active) in self.pending.drain(..) {
            let position = self.active.iter().position(|active| *active == handle);
            match (want_active, position) {
                (true, None) => self.active.push(handle),
                (false, Some(index)) => {
                    self.active.remove(index);
                }
                _ => {}
            }
        }
    }

    /// Apply only the queued removals, leaving queued adds for the next
    /// full flush
    pub fn flush_pending_removals(&mut self) {
        let active = &mut self.active;
        self.pending.retain(|handle, want_active| {
            if !*want_active {
                active.retain(|entry| entry != handle);
            }
            *want_active
        });
    }

    /// Current state of a participant
    pub fn state(&self, handle: MiddlewareHandle) -> ParticipantState {
        if !self.slots.contains_key(handle) {
            return ParticipantState::Unregistered;
        }

        let is_active = self.active.contains(&handle);
        match (self.pending.get(&handle), is_active) {
            (Some(true), false) => ParticipantState::PendingAdd,
            (Some(false), true) => ParticipantState::PendingRemove,
            (_, true) => ParticipantState::Active,
            (_, false) => ParticipantState::Unregistered,
        }
    }

    /// Update list in call order
    pub fn active(&self) -> &[MiddlewareHandle] {
        &self.active
    }

    /// Number of queued intents
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of registered participants
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Strong reference to a live participant
    pub fn resolve(&self, handle: MiddlewareHandle) -> Option<SharedMiddleware> {
        self.slots.get(handle).and_then(Weak::upgrade)
    }

    /// Drop participants whose owners let them go without unregistering
    pub fn prune(&mut self, dead: &[MiddlewareHandle]) {
        for handle in dead {
            self.unregister(*handle);
        }
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.slots.clear();
        self.active.clear();
        self.pending.clear();
    }
}
