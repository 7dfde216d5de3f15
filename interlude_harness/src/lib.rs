// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic host harness for testing interlude schedulers.
//!
//! [`FakeHost`] implements [`Host`] over a manual clock and explicit queues:
//! nothing fires until a test says so, and timers fire in due-time order as
//! the clock [`advance`](FakeHost::advance)s. This makes scheduler behavior
//! reproducible down to the interleaving, which is the whole point — the
//! properties worth testing here are about *order* and *exactly-once*, not
//! about wall-clock speed.
//!
//! The scenario tests at the bottom of this crate double as executable
//! documentation of the scheduler's contract.

#![no_std]

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use interlude_core::host::{
    Continuation, FrameCallback, FrameHandle, Host, IdleCallback, IdleDeadline, Visibility,
};
use interlude_core::time::{Duration, HostTime};

struct Timer {
    due: HostTime,
    seq: u64,
    cb: Continuation,
}

/// A fully scripted [`Host`].
///
/// Construct with [`FakeHost::new`], hand a [`clone_dyn`](Self::clone_dyn)
/// to the scheduler under test, then drive time and queues explicitly:
///
/// - [`advance`](Self::advance) moves the clock and fires timers as they
///   come due;
/// - [`fire_frame`](Self::fire_frame), [`fire_idle`](Self::fire_idle) and
///   [`fire_yields`](Self::fire_yields) fire the queued platform callbacks;
/// - [`hide`](Self::hide) flips visibility and fires the lifecycle hooks,
///   like a real tab switch.
pub struct FakeHost {
    now: Cell<HostTime>,
    visibility: Cell<Visibility>,
    native_yield: Cell<bool>,
    next_frame_id: Cell<i32>,
    next_seq: Cell<u64>,
    frames: RefCell<Vec<(FrameHandle, FrameCallback)>>,
    idles: RefCell<Vec<IdleCallback>>,
    timers: RefCell<Vec<Timer>>,
    yields: RefCell<Vec<Continuation>>,
    hidden_hooks: RefCell<Vec<Continuation>>,
    cancelled: RefCell<Vec<FrameHandle>>,
}

impl core::fmt::Debug for FakeHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FakeHost")
            .field("now", &self.now.get())
            .field("visibility", &self.visibility.get())
            .field("frames", &self.frames.borrow().len())
            .field("timers", &self.timers.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            now: Cell::new(HostTime(1_000_000)),
            visibility: Cell::new(Visibility::Visible),
            native_yield: Cell::new(false),
            next_frame_id: Cell::new(1),
            next_seq: Cell::new(0),
            frames: RefCell::new(Vec::new()),
            idles: RefCell::new(Vec::new()),
            timers: RefCell::new(Vec::new()),
            yields: RefCell::new(Vec::new()),
            hidden_hooks: RefCell::new(Vec::new()),
            cancelled: RefCell::new(Vec::new()),
        }
    }
}

impl FakeHost {
    /// Creates a host with the clock at an arbitrary nonzero start time and
    /// the page visible.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// The same host as a `Rc<dyn Host>`, for handing to a scheduler.
    #[must_use]
    pub fn clone_dyn(self: &Rc<Self>) -> Rc<dyn Host> {
        Rc::clone(self) as Rc<dyn Host>
    }

    /// Sets the reported page visibility. Does not fire lifecycle hooks; use
    /// [`hide`](Self::hide) for the full tab-switch sequence.
    pub fn set_visibility(&self, v: Visibility) {
        self.visibility.set(v);
    }

    /// Enables or disables the native cooperative-yield primitive.
    pub fn set_native_yield(&self, on: bool) {
        self.native_yield.set(on);
    }

    /// Simulates the page going hidden: visibility flips first, then every
    /// registered lifecycle hook fires, in registration order.
    pub fn hide(&self) {
        self.visibility.set(Visibility::Hidden);
        self.fire_hidden();
    }

    /// Advances the clock by `d`, firing timers in due-time order as they
    /// come due. Timers scheduled by fired callbacks participate if they
    /// fall within the window.
    pub fn advance(&self, d: Duration) {
        let target = self.now.get().saturating_add(d);
        self.run_timers_until(target);
        self.now.set(target);
    }

    /// Fires every timer due at the current clock (zero-delay timers and
    /// anything they schedule at zero delay). Returns how many fired.
    pub fn run_due_timers(&self) -> usize {
        self.run_timers_until(self.now.get())
    }

    fn run_timers_until(&self, target: HostTime) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let idx = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                idx.map(|i| timers.remove(i))
            };
            let Some(timer) = next else {
                return fired;
            };
            if timer.due > self.now.get() {
                self.now.set(timer.due);
            }
            (timer.cb)();
            fired += 1;
        }
    }

    /// Fires the oldest pending frame callback at the current clock.
    /// Returns `false` if none was pending.
    pub fn fire_frame(&self) -> bool {
        let next = {
            let mut frames = self.frames.borrow_mut();
            if frames.is_empty() {
                None
            } else {
                Some(frames.remove(0))
            }
        };
        match next {
            Some((_, cb)) => {
                cb(self.now.get());
                true
            }
            None => false,
        }
    }

    /// Fires the oldest pending idle callback with a full 50 ms budget.
    pub fn fire_idle(&self) -> bool {
        self.fire_idle_with(IdleDeadline {
            did_timeout: false,
            time_remaining: Duration::from_millis(50),
        })
    }

    /// Fires the oldest pending idle callback with an explicit deadline
    /// snapshot. Returns `false` if none was pending.
    pub fn fire_idle_with(&self, deadline: IdleDeadline) -> bool {
        let next = {
            let mut idles = self.idles.borrow_mut();
            if idles.is_empty() {
                None
            } else {
                Some(idles.remove(0))
            }
        };
        match next {
            Some(cb) => {
                cb(deadline);
                true
            }
            None => false,
        }
    }

    /// Runs every native-yield continuation queued so far, in order.
    pub fn fire_yields(&self) -> usize {
        let batch = self.yields.take();
        let count = batch.len();
        for cb in batch {
            cb();
        }
        count
    }

    /// Fires (and drains) every registered lifecycle hook without touching
    /// visibility.
    pub fn fire_hidden(&self) {
        let batch = self.hidden_hooks.take();
        for cb in batch {
            cb();
        }
    }

    /// Number of currently-registered lifecycle hooks.
    #[must_use]
    pub fn hidden_hooks(&self) -> usize {
        self.hidden_hooks.borrow().len()
    }

    /// Frame handles cancelled so far, in cancellation order.
    #[must_use]
    pub fn cancelled(&self) -> Vec<FrameHandle> {
        self.cancelled.borrow().clone()
    }

    /// Number of frame requests currently pending.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Number of timers currently pending.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Host for FakeHost {
    fn now(&self) -> HostTime {
        self.now.get()
    }

    fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    fn request_frame(&self, cb: FrameCallback) -> FrameHandle {
        let id = self.next_frame_id.get();
        self.next_frame_id.set(id + 1);
        let handle = FrameHandle(id);
        self.frames.borrow_mut().push((handle, cb));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.frames.borrow_mut().retain(|(h, _)| *h != handle);
        self.cancelled.borrow_mut().push(handle);
    }

    fn request_idle(&self, cb: IdleCallback) {
        self.idles.borrow_mut().push(cb);
    }

    fn set_timeout(&self, delay: Duration, cb: Continuation) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.timers.borrow_mut().push(Timer {
            due: self.now.get().saturating_add(delay),
            seq,
            cb,
        });
    }

    fn has_native_yield(&self) -> bool {
        self.native_yield.get()
    }

    fn request_yield(&self, cb: Continuation) {
        self.yields.borrow_mut().push(cb);
    }

    fn on_hidden(&self, cb: Continuation) {
        self.hidden_hooks.borrow_mut().push(cb);
    }
}

/// Polls a future once with a no-op waker.
///
/// Scheduler readiness is carried by shared cells, so tests poll after each
/// host step instead of relying on wakeups.
pub fn poll_once<F: Future>(fut: Pin<&mut F>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    fut.poll(&mut cx)
}

/// Polls `fut` to completion, stepping the host's queues between polls.
///
/// # Panics
///
/// Panics if the future does not finish within a bounded number of steps,
/// which in practice means it is waiting on something only the clock can
/// deliver — drive those futures by hand with [`FakeHost::advance`].
pub fn drive<F: Future>(host: &Rc<FakeHost>, mut fut: Pin<&mut F>) -> F::Output {
    for _ in 0..1_000 {
        match poll_once(fut.as_mut()) {
            Poll::Ready(v) => return v,
            Poll::Pending => {
                host.fire_frame();
                host.fire_yields();
                host.fire_idle();
                host.run_due_timers();
            }
        }
    }
    panic!("future did not complete within 1000 host steps");
}
