// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred-execution wrappers.
//!
//! Thin policies over the [`Host`] primitives and the yield scheduler:
//!
//! - [`when_idle`](crate::scheduler::YieldScheduler::when_idle) — run during
//!   the next idle period (costly non-UI calls).
//! - [`next_frame`](crate::scheduler::YieldScheduler::next_frame) — run at
//!   the next visual frame (costly UI mutations).
//! - [`after_paint`](crate::scheduler::YieldScheduler::after_paint) — run one
//!   tick *after* the next frame (or a fallback timer, whichever fires
//!   first), so the work lands past the browser's own paint instead of
//!   contending with it. [`read_layout`](crate::scheduler::YieldScheduler::read_layout)
//!   is the same policy under the name used for layout reads.
//!
//! Each wrapper takes a zero-argument closure and returns a [`Deferred`]
//! future resolving to the closure's result. Closure panics propagate
//! unmodified out of the host callback; nothing here catches or retries.
//!
//! [`Host`]: crate::host::Host

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use crate::host::FrameHandle;
use crate::scheduler::YieldScheduler;
use crate::time::Duration;
use crate::trace::{DeferKind, DeferredScheduledEvent};

pub(crate) struct DeferredState<R> {
    value: RefCell<Option<R>>,
    waker: RefCell<Option<Waker>>,
}

impl<R> DeferredState<R> {
    pub(crate) fn complete(&self, value: R) {
        *self.value.borrow_mut() = Some(value);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Future resolving to a deferred closure's result.
///
/// Resolves exactly once. A deferred call that is superseded by a newer
/// debounced call never resolves; dropping an unresolved `Deferred` is
/// harmless and does not cancel the scheduled work.
#[must_use = "a deferred call does nothing observable until awaited"]
pub struct Deferred<R> {
    state: Rc<DeferredState<R>>,
}

impl<R> core::fmt::Debug for Deferred<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Deferred")
            .field("resolved", &self.state.value.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl<R> Deferred<R> {
    pub(crate) fn new() -> (Self, Rc<DeferredState<R>>) {
        let state = Rc::new(DeferredState {
            value: RefCell::new(None),
            waker: RefCell::new(None),
        });
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl<R> Future for Deferred<R> {
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<R> {
        if let Some(value) = self.state.value.borrow_mut().take() {
            return Poll::Ready(value);
        }
        let mut slot = self.state.waker.borrow_mut();
        match &mut *slot {
            Some(existing) => existing.clone_from(cx.waker()),
            None => *slot = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

impl YieldScheduler {
    /// Defers a costly non-UI call to the next idle period.
    ///
    /// The host's idle budget is not consulted: `f` runs whole once the idle
    /// callback fires. Use budgeted iteration for work that should respect a
    /// time budget.
    pub fn when_idle<R: 'static>(&self, f: impl FnOnce() -> R + 'static) -> Deferred<R> {
        self.inner
            .tracer
            .borrow_mut()
            .deferred_scheduled(&DeferredScheduledEvent {
                kind: DeferKind::Idle,
            });
        let (deferred, state) = Deferred::new();
        self.inner
            .host
            .request_idle(Box::new(move |_deadline| state.complete(f())));
        deferred
    }

    /// Defers a costly UI mutation to the next visual frame.
    pub fn next_frame<R: 'static>(&self, f: impl FnOnce() -> R + 'static) -> Deferred<R> {
        self.inner
            .tracer
            .borrow_mut()
            .deferred_scheduled(&DeferredScheduledEvent {
                kind: DeferKind::Frame,
            });
        let (deferred, state) = Deferred::new();
        self.inner
            .host
            .request_frame(Box::new(move |_now| state.complete(f())));
        deferred
    }

    /// Runs `f` one scheduling tick after the next frame.
    ///
    /// Races "next frame fires" against the configured fallback timer
    /// ([`YieldConfig::paint_fallback`]) so the work still runs on a tab
    /// where frames never fire; the loser of the race is discarded (the
    /// pending frame request is cancelled when the timer wins). Either way
    /// one extra tick is inserted, guaranteeing execution slightly *after*
    /// paint rather than at it.
    ///
    /// [`YieldConfig::paint_fallback`]: crate::scheduler::YieldConfig::paint_fallback
    pub fn after_paint<R: 'static>(&self, f: impl FnOnce() -> R + 'static) -> Deferred<R> {
        self.inner
            .tracer
            .borrow_mut()
            .deferred_scheduled(&DeferredScheduledEvent {
                kind: DeferKind::AfterPaint,
            });
        let (deferred, state) = Deferred::new();
        let work: Rc<RefCell<Option<Box<dyn FnOnce()>>>> =
            Rc::new(RefCell::new(Some(Box::new(move || state.complete(f())))));
        let raced = Rc::new(Cell::new(false));
        let frame = Rc::new(Cell::new(None::<FrameHandle>));

        {
            let host = Rc::clone(&self.inner.host);
            let work = Rc::clone(&work);
            let raced = Rc::clone(&raced);
            let frame_in_cb = Rc::clone(&frame);
            let handle = self.inner.host.request_frame(Box::new(move |_now| {
                if raced.replace(true) {
                    return;
                }
                frame_in_cb.set(None);
                if let Some(work) = work.borrow_mut().take() {
                    host.set_timeout(Duration::ZERO, work);
                }
            }));
            frame.set(Some(handle));
        }

        {
            let host = Rc::clone(&self.inner.host);
            self.inner.host.set_timeout(
                self.inner.config.paint_fallback,
                Box::new(move || {
                    if raced.replace(true) {
                        return;
                    }
                    if let Some(handle) = frame.take() {
                        host.cancel_frame(handle);
                    }
                    if let Some(work) = work.borrow_mut().take() {
                        host.set_timeout(Duration::ZERO, work);
                    }
                }),
            );
        }

        deferred
    }

    /// Reads a layout-affecting value without forcing a synchronous layout.
    ///
    /// Alias for [`after_paint`](Self::after_paint): layout reads scheduled
    /// just past paint see fresh geometry without thrashing.
    pub fn read_layout<R: 'static>(&self, f: impl FnOnce() -> R + 'static) -> Deferred<R> {
        self.after_paint(f)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;
    use core::pin::pin;
    use core::task::Poll;

    use super::*;
    use crate::testhost::{TestHost, poll_once};

    #[test]
    fn when_idle_runs_at_idle_and_resolves() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        let mut fut = pin!(sched.when_idle(move || {
            r.set(true);
            7u32
        }));

        assert_eq!(poll_once(fut.as_mut()), Poll::Pending);
        assert!(!ran.get(), "work must wait for the idle callback");
        assert!(host.fire_idle());
        assert!(ran.get());
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(7));
    }

    #[test]
    fn next_frame_runs_at_frame() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let mut fut = pin!(sched.next_frame(|| "painted"));
        assert_eq!(poll_once(fut.as_mut()), Poll::Pending);
        assert!(host.fire_frame());
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready("painted"));
    }

    #[test]
    fn after_paint_waits_one_tick_past_the_frame() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        let mut fut = pin!(sched.after_paint(move || r.set(true)));

        assert!(host.fire_frame());
        assert!(!ran.get(), "must not run inside the frame callback");
        host.run_timeouts();
        assert!(ran.get());
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(()));
    }

    #[test]
    fn after_paint_falls_back_to_timer_and_cancels_frame() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let mut fut = pin!(sched.after_paint(|| 3u8));
        assert_eq!(host.pending_frames(), 1);

        // No frame ever fires; the fallback timer wins the race.
        host.run_timeouts();
        assert_eq!(
            host.cancelled().len(),
            1,
            "the losing frame request is cancelled"
        );
        host.run_timeouts();
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(3));
    }

    #[test]
    fn after_paint_runs_exactly_once_when_both_fire() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let mut fut = pin!(sched.after_paint(move || h.set(h.get() + 1)));

        host.fire_frame();
        // Fallback timer fires late; the extra tick runs in the same drain.
        host.run_timeouts();
        host.run_timeouts();
        assert_eq!(hits.get(), 1, "race loser must be a no-op");
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(()));
    }

    #[test]
    fn read_layout_is_after_paint() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let mut fut = pin!(sched.read_layout(|| 42u64));
        host.fire_frame();
        host.run_timeouts();
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(42));
    }
}
