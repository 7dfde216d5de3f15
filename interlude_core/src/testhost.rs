// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal deterministic host for in-crate unit tests.
//!
//! Queues every callback and fires it only when a test says so. The
//! `interlude_harness` crate ships the full-featured equivalent for
//! downstream use; this one stays private so the core has no dev-dependency
//! cycle.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use crate::host::{
    Continuation, FrameCallback, FrameHandle, Host, IdleCallback, IdleDeadline, Visibility,
};
use crate::time::{Duration, HostTime};

pub(crate) struct TestHost {
    now: Cell<HostTime>,
    visibility: Cell<Visibility>,
    native_yield: Cell<bool>,
    next_frame_id: Cell<i32>,
    frames: RefCell<Vec<(FrameHandle, FrameCallback)>>,
    idles: RefCell<Vec<IdleCallback>>,
    timeouts: RefCell<Vec<(Duration, Continuation)>>,
    yields: RefCell<Vec<Continuation>>,
    hidden_hooks: RefCell<Vec<Continuation>>,
    cancelled: RefCell<Vec<FrameHandle>>,
}

impl TestHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(HostTime(1_000_000)),
            visibility: Cell::new(Visibility::Visible),
            native_yield: Cell::new(false),
            next_frame_id: Cell::new(1),
            frames: RefCell::new(Vec::new()),
            idles: RefCell::new(Vec::new()),
            timeouts: RefCell::new(Vec::new()),
            yields: RefCell::new(Vec::new()),
            hidden_hooks: RefCell::new(Vec::new()),
            cancelled: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn clone_dyn(self: &Rc<Self>) -> Rc<dyn Host> {
        Rc::clone(self) as Rc<dyn Host>
    }

    pub(crate) fn set_visibility(&self, v: Visibility) {
        self.visibility.set(v);
    }

    pub(crate) fn set_native_yield(&self, on: bool) {
        self.native_yield.set(on);
    }

    pub(crate) fn advance(&self, d: Duration) {
        self.now.set(self.now.get().saturating_add(d));
    }

    /// Fires the oldest pending frame callback. Returns `false` if none.
    pub(crate) fn fire_frame(&self) -> bool {
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

    /// Fires the oldest pending idle callback. Returns `false` if none.
    pub(crate) fn fire_idle(&self) -> bool {
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
                cb(IdleDeadline {
                    did_timeout: false,
                    time_remaining: Duration::from_millis(50),
                });
                true
            }
            None => false,
        }
    }

    /// Runs every timeout queued so far, in order. Timeouts scheduled while
    /// running are left for the next call, like a fresh timer turn.
    pub(crate) fn run_timeouts(&self) -> usize {
        let batch = self.timeouts.take();
        let count = batch.len();
        for (_, cb) in batch {
            cb();
        }
        count
    }

    /// Runs every native-yield continuation queued so far.
    pub(crate) fn fire_yields(&self) -> usize {
        let batch = self.yields.take();
        let count = batch.len();
        for cb in batch {
            cb();
        }
        count
    }

    /// Fires (and drains) all registered lifecycle hooks.
    pub(crate) fn fire_hidden(&self) {
        let batch = self.hidden_hooks.take();
        for cb in batch {
            cb();
        }
    }

    /// Number of currently-registered lifecycle hooks.
    pub(crate) fn hidden_hooks(&self) -> usize {
        self.hidden_hooks.borrow().len()
    }

    /// Frame handles cancelled so far.
    pub(crate) fn cancelled(&self) -> Vec<FrameHandle> {
        self.cancelled.borrow().clone()
    }

    /// Number of frame requests currently pending.
    pub(crate) fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl Host for TestHost {
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
        self.timeouts.borrow_mut().push((delay, cb));
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
/// Readiness in this crate is carried by shared cells, so tests poll after
/// each host step instead of relying on wakeups.
pub(crate) fn poll_once<F: Future>(fut: Pin<&mut F>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    fut.poll(&mut cx)
}

/// Polls `fut` to completion, driving the host's frame/tick/yield queues
/// between polls. Panics if the future does not finish within a bounded
/// number of steps.
pub(crate) fn drive<F: Future>(host: &Rc<TestHost>, mut fut: Pin<&mut F>) -> F::Output {
    for _ in 0..1_000 {
        match poll_once(fut.as_mut()) {
            Poll::Ready(v) => return v,
            Poll::Pending => {
                host.fire_frame();
                host.fire_yields();
                host.fire_idle();
                host.run_timeouts();
            }
        }
    }
    panic!("future did not complete within 1000 host steps");
}
