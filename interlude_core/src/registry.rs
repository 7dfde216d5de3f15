// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Suspension bookkeeping for pending yields.
//!
//! Every yield operation registers a [`PendingYield`] in a
//! [`SuspensionRegistry`] until it is resumed — either normally, by the host
//! scheduling mechanism firing, or forcibly, when a page-lifecycle transition
//! sweeps the whole registry. The invariants are small but load-bearing:
//!
//! - an entry is added exactly once and resumed **at most** once; a second
//!   resume is a silent no-op, never a duplicate side effect;
//! - removing an entry that a sweep already drained is a no-op;
//! - a sweep resumes entries in registration order within one synchronous
//!   pass and leaves the registry empty.
//!
//! Everything here is single-threaded; `Cell`/`RefCell` suffice and no
//! borrow is held across a caller-supplied continuation.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::task::Waker;

/// What to do when a suspended yield resumes.
enum ResumeAction {
    /// Wake a future that is parked on this entry.
    Wake(Waker),
    /// Run a callback-form continuation inline.
    Run(Box<dyn FnOnce()>),
}

/// One suspended unit of work.
///
/// Created when a yield is requested and owned by the [`SuspensionRegistry`]
/// until it fires. The resumption side effect (waking a parked future or
/// running a continuation) happens on the first [`resume`](Self::resume)
/// call only.
pub struct PendingYield {
    resumed: Cell<bool>,
    action: RefCell<Option<ResumeAction>>,
}

impl core::fmt::Debug for PendingYield {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PendingYield")
            .field("resumed", &self.resumed.get())
            .finish_non_exhaustive()
    }
}

impl PendingYield {
    /// Creates a fresh, unresumed entry.
    #[must_use]
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            resumed: Cell::new(false),
            action: RefCell::new(None),
        })
    }

    /// Whether this entry has already been resumed.
    #[must_use]
    pub fn is_resumed(&self) -> bool {
        self.resumed.get()
    }

    /// Resumes this entry, running its action if one is attached.
    ///
    /// The first call wins; later calls (a natural firing racing a forced
    /// sweep, or vice versa) are no-ops. The action is taken out of the slot
    /// before it runs, so a continuation that itself yields sees a clean
    /// entry.
    pub fn resume(&self) {
        if self.resumed.replace(true) {
            return;
        }
        let action = self.action.borrow_mut().take();
        match action {
            Some(ResumeAction::Wake(waker)) => waker.wake(),
            Some(ResumeAction::Run(cb)) => cb(),
            None => {}
        }
    }

    /// Parks a future's waker on this entry.
    ///
    /// Callers must check [`is_resumed`](Self::is_resumed) first; a waker
    /// stored after resumption would never be woken.
    pub(crate) fn set_waker(&self, waker: &Waker) {
        let mut slot = self.action.borrow_mut();
        match &mut *slot {
            Some(ResumeAction::Wake(existing)) => existing.clone_from(waker),
            _ => *slot = Some(ResumeAction::Wake(waker.clone())),
        }
    }

    /// Attaches a callback-form continuation to this entry.
    pub(crate) fn set_continuation(&self, cb: Box<dyn FnOnce()>) {
        *self.action.borrow_mut() = Some(ResumeAction::Run(cb));
    }
}

/// The set of all currently-suspended yields.
///
/// Page-lifetime mutable state, touched only synchronously. Entries are
/// inserted on suspension, removed on normal resumption, and drained
/// wholesale by [`sweep`](Self::sweep).
#[derive(Debug, Default)]
pub struct SuspensionRegistry {
    entries: RefCell<Vec<Rc<PendingYield>>>,
}

impl SuspensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently-suspended entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no yields are currently suspended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Registers a new entry. Order of insertion is the order a later
    /// [`sweep`](Self::sweep) resumes in.
    pub(crate) fn insert(&self, entry: Rc<PendingYield>) {
        self.entries.borrow_mut().push(entry);
    }

    /// Removes an entry after its normal resumption.
    ///
    /// A no-op if a sweep already drained it.
    pub(crate) fn remove(&self, entry: &Rc<PendingYield>) {
        self.entries
            .borrow_mut()
            .retain(|e| !Rc::ptr_eq(e, entry));
    }

    /// Drains the registry and resumes every entry in registration order.
    ///
    /// Returns the number of entries swept. The vector is taken out before
    /// any continuation runs, so continuations that suspend again register
    /// into a fresh, post-sweep registry.
    pub fn sweep(&self) -> usize {
        let drained = self.entries.take();
        let count = drained.len();
        for entry in drained {
            entry.resume();
        }
        count
    }
}
