// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debounce-to-frame coalescing.
//!
//! [`Debounced`] wraps a function so that rapid repeated calls collapse into
//! at most one execution per visual frame: each call cancels the frame
//! request of the previous not-yet-fired call and schedules its own. Only the
//! most recent call's argument ever reaches the wrapped function, and only
//! that call's future resolves — superseded futures stay pending forever,
//! which is debounce semantics, not throttling.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use crate::defer::Deferred;
use crate::host::FrameHandle;
use crate::scheduler::YieldScheduler;
use crate::trace::{DeferKind, DeferredScheduledEvent};

struct DebounceInner<A, R> {
    scheduler: YieldScheduler,
    f: RefCell<Box<dyn FnMut(A) -> R>>,
    pending: Cell<Option<FrameHandle>>,
}

/// A frame-debounced wrapper around a function.
///
/// Create with [`Debounced::new`], invoke with [`call`](Self::call). Clones
/// share the same pending-frame slot, so calls through different clones still
/// coalesce.
///
/// The wrapped function must not recursively invoke the same `Debounced`
/// instance; it is borrowed for the duration of each execution.
pub struct Debounced<A, R> {
    inner: Rc<DebounceInner<A, R>>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, R> core::fmt::Debug for Debounced<A, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Debounced")
            .field("pending", &self.inner.pending.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<A: 'static, R: 'static> Debounced<A, R> {
    /// Wraps `f` so calls coalesce to one execution per frame.
    #[must_use]
    pub fn new(scheduler: &YieldScheduler, f: impl FnMut(A) -> R + 'static) -> Self {
        Self {
            inner: Rc::new(DebounceInner {
                scheduler: scheduler.clone(),
                f: RefCell::new(Box::new(f)),
                pending: Cell::new(None),
            }),
        }
    }

    /// Schedules the wrapped function for the next frame with `arg`,
    /// cancelling any not-yet-fired previous call.
    ///
    /// The returned future resolves with the result of *this* invocation —
    /// and never resolves if a newer call supersedes it first.
    pub fn call(&self, arg: A) -> Deferred<R> {
        let sched = &self.inner.scheduler;
        if let Some(handle) = self.inner.pending.take() {
            sched.host().cancel_frame(handle);
            sched.inner.tracer.borrow_mut().debounce_superseded();
        }
        sched
            .inner
            .tracer
            .borrow_mut()
            .deferred_scheduled(&DeferredScheduledEvent {
                kind: DeferKind::Debounced,
            });

        let (deferred, state) = Deferred::new();
        let inner = Rc::clone(&self.inner);
        let handle = sched.host().request_frame(Box::new(move |_now| {
            inner.pending.set(None);
            let result = (inner.f.borrow_mut())(arg);
            state.complete(result);
        }));
        self.inner.pending.set(Some(handle));
        deferred
    }
}
