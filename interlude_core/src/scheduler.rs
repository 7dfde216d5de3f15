// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cooperative yield scheduler.
//!
//! [`YieldScheduler`] decides when a unit of work pauses to hand control back
//! to the host's rendering and input pipeline, and when it is safe to resume.
//! It balances "do not block the frame" against "do not starve the work
//! forever" using only the coarse primitives a [`Host`] provides, all of
//! which can silently stop firing on a hidden or dying page. The registry of
//! suspended yields exists so a lifecycle transition can force-resume
//! everything at once instead of leaving work parked forever.
//!
//! A yield resumes through the best mechanism available:
//!
//! 1. the host's native cooperative-yield primitive, when present;
//! 2. otherwise "next frame, then one timer tick" — two stages approximate a
//!    low-priority yield, landing just after the frame's own work.
//!
//! The scheduler is constructor-instantiated and cheaply cloneable; separate
//! instances own separate registries, so tests can run several side by side.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::host::{Host, Visibility};
use crate::registry::{PendingYield, SuspensionRegistry};
use crate::time::Duration;
use crate::trace::{ForcedSweepEvent, Tracer, YieldRequestedEvent, YieldResumedEvent};

/// Tunable policy knobs, per scheduler instance.
#[derive(Clone, Copy, Debug)]
pub struct YieldConfig {
    /// Safety-net delay for `after_paint`: if no frame fires within this
    /// window (e.g. on a backgrounded tab), the work proceeds anyway.
    pub paint_fallback: Duration,
    /// Wall-clock budget for one chunk of budgeted iteration when the caller
    /// passes no explicit limit.
    pub chunk_budget: Duration,
}

impl YieldConfig {
    /// Default configuration for the web.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            paint_fallback: Duration::from_millis(100),
            chunk_budget: crate::chunk::DEFAULT_CHUNK_BUDGET,
        }
    }
}

impl Default for YieldConfig {
    fn default() -> Self {
        Self::web()
    }
}

pub(crate) struct SchedulerInner {
    pub(crate) host: Rc<dyn Host>,
    pub(crate) registry: SuspensionRegistry,
    pub(crate) config: YieldConfig,
    /// Whether a one-shot lifecycle hook is currently registered with the
    /// host. Re-armed on the first suspension after each firing.
    lifecycle_armed: Cell<bool>,
    pub(crate) tracer: RefCell<Tracer>,
}

/// Decides when work pauses and when it resumes.
///
/// Cloning is cheap and shares the same registry and host. See the
/// [module docs](self) for the resumption strategy.
#[derive(Clone)]
pub struct YieldScheduler {
    pub(crate) inner: Rc<SchedulerInner>,
}

impl core::fmt::Debug for YieldScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("YieldScheduler")
            .field("pending", &self.inner.registry.len())
            .field("lifecycle_armed", &self.inner.lifecycle_armed.get())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl YieldScheduler {
    /// Creates a scheduler over `host` with [`YieldConfig::web`] defaults.
    #[must_use]
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self::with_config(host, YieldConfig::web())
    }

    /// Creates a scheduler with an explicit configuration.
    #[must_use]
    pub fn with_config(host: Rc<dyn Host>, config: YieldConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                host,
                registry: SuspensionRegistry::new(),
                config,
                lifecycle_armed: Cell::new(false),
                tracer: RefCell::new(Tracer::none()),
            }),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> YieldConfig {
        self.inner.config
    }

    /// Returns the host this scheduler drives.
    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.inner.host
    }

    /// Number of currently-suspended yields.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.registry.len()
    }

    /// Installs a tracer; replaces any previous one.
    pub fn set_tracer(&self, tracer: Tracer) {
        *self.inner.tracer.borrow_mut() = tracer;
    }

    /// Suspends the caller until the host considers it safe to resume.
    ///
    /// The returned future resolves once the yield fires — through the native
    /// cooperative-yield primitive, the frame-then-tick fallback, or a forced
    /// lifecycle sweep. It always resolves eventually; on a hidden page it is
    /// resolved before this call returns (along with every other pending
    /// yield, since none of them can be usefully deferred there).
    #[must_use]
    pub fn yield_now(&self) -> YieldPoint {
        YieldPoint {
            entry: self.suspend(),
        }
    }

    /// Callback form of [`yield_now`](Self::yield_now): runs `cb` when the
    /// yield fires, inline if it already has.
    ///
    /// Useful from glue code that has no executor at hand.
    pub fn yield_with(&self, cb: impl FnOnce() + 'static) {
        let entry = self.suspend();
        if entry.is_resumed() {
            cb();
        } else {
            entry.set_continuation(Box::new(cb));
        }
    }

    /// Force-resumes every suspended yield, in registration order, within
    /// this call. Returns how many were resumed.
    ///
    /// This is the lifecycle escape hatch: the wait is cancelled but every
    /// continuation still runs.
    pub fn force_resume_all(&self) -> usize {
        let swept = self.inner.registry.sweep();
        self.inner
            .tracer
            .borrow_mut()
            .forced_sweep(&ForcedSweepEvent { swept });
        swept
    }

    fn suspend(&self) -> Rc<PendingYield> {
        let inner = &self.inner;
        let entry = PendingYield::new();
        inner.registry.insert(Rc::clone(&entry));

        let visibility = inner.host.visibility();
        let native = inner.host.has_native_yield();
        inner
            .tracer
            .borrow_mut()
            .yield_requested(&YieldRequestedEvent {
                pending: inner.registry.len(),
                visibility,
                native,
            });

        if visibility == Visibility::Hidden {
            // The user cannot perceive jank on a hidden page, and frame/idle
            // callbacks may never fire there. Resolve everything now,
            // including the entry just added.
            self.force_resume_all();
            return entry;
        }

        self.arm_lifecycle();

        let resume: Box<dyn FnOnce()> = {
            let inner = Rc::clone(&self.inner);
            let entry = Rc::clone(&entry);
            Box::new(move || {
                inner.registry.remove(&entry);
                if !entry.is_resumed() {
                    inner.tracer.borrow_mut().yield_resumed(&YieldResumedEvent {
                        remaining: inner.registry.len(),
                    });
                }
                entry.resume();
            })
        };

        if native {
            inner.host.request_yield(resume);
        } else {
            // Two-stage fallback: the frame callback runs *before* paint, so
            // resuming there would contend with the frame's own work. One
            // more timer tick lands just after it.
            let host = Rc::clone(&inner.host);
            inner.host.request_frame(Box::new(move |_now| {
                host.set_timeout(Duration::ZERO, resume);
            }));
        }

        entry
    }

    fn arm_lifecycle(&self) {
        if self.inner.lifecycle_armed.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.inner.host.on_hidden(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Disarm before sweeping so continuations that suspend again
            // re-register the hook.
            inner.lifecycle_armed.set(false);
            let swept = inner.registry.sweep();
            inner
                .tracer
                .borrow_mut()
                .forced_sweep(&ForcedSweepEvent { swept });
        }));
    }
}

/// Future returned by [`YieldScheduler::yield_now`].
///
/// Resolves to `()` once the suspended work may continue. Dropping it before
/// resumption is harmless; the registry entry is cleaned up when the host
/// mechanism (or a sweep) fires.
#[derive(Debug)]
#[must_use = "a yield point does nothing until awaited"]
pub struct YieldPoint {
    entry: Rc<PendingYield>,
}

impl Future for YieldPoint {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.entry.is_resumed() {
            Poll::Ready(())
        } else {
            self.entry.set_waker(cx.waker());
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};
    use core::pin::pin;
    use core::task::Poll;

    use super::*;
    use crate::testhost::{TestHost, poll_once};

    #[test]
    fn fallback_resumes_after_frame_and_tick() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let resumed = Rc::new(Cell::new(false));
        let r = Rc::clone(&resumed);
        sched.yield_with(move || r.set(true));

        assert_eq!(sched.pending(), 1);
        assert!(host.fire_frame(), "a frame request must be pending");
        assert!(!resumed.get(), "the frame alone must not resume work");
        host.run_timeouts();
        assert!(resumed.get(), "the tick after the frame resumes work");
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn native_yield_used_when_available() {
        let host = TestHost::new();
        host.set_native_yield(true);
        let sched = YieldScheduler::new(host.clone_dyn());

        let resumed = Rc::new(Cell::new(false));
        let r = Rc::clone(&resumed);
        sched.yield_with(move || r.set(true));

        assert!(!host.fire_frame(), "no frame request on the native path");
        host.fire_yields();
        assert!(resumed.get());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn hidden_page_resolves_immediately_and_sweeps_peers() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let first = Rc::new(Cell::new(false));
        let f = Rc::clone(&first);
        sched.yield_with(move || f.set(true));
        assert_eq!(sched.pending(), 1);

        host.set_visibility(Visibility::Hidden);
        let second = Rc::new(Cell::new(false));
        let s = Rc::clone(&second);
        sched.yield_with(move || s.set(true));

        assert!(first.get(), "existing yields are swept");
        assert!(second.get(), "the new yield resolves inline");
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn lifecycle_event_sweeps_all_pending_in_order() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let o = Rc::clone(&order);
            sched.yield_with(move || o.borrow_mut().push(i));
        }
        assert_eq!(sched.pending(), 3);
        assert_eq!(host.hidden_hooks(), 1, "one lifecycle hook for many yields");

        host.fire_hidden();
        assert_eq!(*order.borrow(), [0, 1, 2]);
        assert_eq!(sched.pending(), 0, "registry is empty immediately after");
    }

    #[test]
    fn natural_firing_after_sweep_is_noop() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        sched.yield_with(move || h.set(h.get() + 1));

        host.fire_hidden();
        assert_eq!(hits.get(), 1);

        // The frame/tick pair still fires later; it must not re-run anything.
        host.fire_frame();
        host.run_timeouts();
        assert_eq!(hits.get(), 1, "double resume must not duplicate effects");
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn lifecycle_rearms_after_sweep() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        sched.yield_with(|| {});
        sched.yield_with(|| {});
        assert_eq!(host.hidden_hooks(), 1);

        host.fire_hidden();
        sched.yield_with(|| {});
        assert_eq!(host.hidden_hooks(), 1, "a fresh hook after the sweep");
    }

    #[test]
    fn yield_point_future_resolves() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let mut fut = pin!(sched.yield_now());
        assert_eq!(poll_once(fut.as_mut()), Poll::Pending);
        assert_eq!(sched.pending(), 1);

        host.fire_frame();
        host.run_timeouts();
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(()));
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn yield_point_resolved_by_sweep_before_first_poll() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let fut = sched.yield_now();
        host.fire_hidden();
        let mut fut = pin!(fut);
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(()));
    }

    #[test]
    fn independent_instances_have_independent_registries() {
        let host = TestHost::new();
        let a = YieldScheduler::new(host.clone_dyn());
        let b = YieldScheduler::new(host.clone_dyn());

        a.yield_with(|| {});
        assert_eq!(a.pending(), 1);
        assert_eq!(b.pending(), 0);

        assert_eq!(a.force_resume_all(), 1);
        assert_eq!(b.force_resume_all(), 0);
    }
}
