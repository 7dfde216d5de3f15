// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Budgeted (chunked) iteration.
//!
//! Applies a function to every element of a sequence in order, synchronously
//! within a chunk, and yields to the host whenever the wall-clock time spent
//! in the current chunk meets or exceeds a budget. The deadline is recomputed
//! from the current time after every yield, so slow elements late in the
//! sequence cannot consume a stale budget.
//!
//! Edge cases follow directly from the deadline arithmetic: a zero budget
//! puts a yield before every element, and [`Duration::MAX`] saturates the
//! deadline to [`HostTime::MAX`] so the iteration never yields.
//!
//! [`HostTime::MAX`]: crate::time::HostTime::MAX

use alloc::rc::Rc;

use crate::scheduler::YieldScheduler;
use crate::time::Duration;
use crate::trace::ChunkYieldEvent;

/// Wall-clock budget for one chunk that [`YieldConfig::web`] seeds
/// `chunk_budget` with.
///
/// 48 ms is three 60 Hz frames: long enough to make real progress, short
/// enough that input latency stays under the common long-task threshold.
///
/// [`YieldConfig::web`]: crate::scheduler::YieldConfig::web
pub const DEFAULT_CHUNK_BUDGET: Duration = Duration::from_millis(48);

impl YieldScheduler {
    /// Applies `f` to every element of `items` in order, yielding whenever
    /// the current chunk has run for at least `limit` (the scheduler's
    /// configured [`chunk_budget`] when `None`).
    ///
    /// Each element is processed exactly once; elements never interleave
    /// with each other, only with the yields between chunks. A panic in `f`
    /// propagates and abandons the remaining elements.
    ///
    /// [`chunk_budget`]: crate::scheduler::YieldConfig::chunk_budget
    pub async fn for_each_budgeted<I>(
        &self,
        items: I,
        mut f: impl FnMut(I::Item),
        limit: Option<Duration>,
    ) where
        I: IntoIterator,
    {
        match self
            .try_for_each_budgeted(
                items,
                |item| {
                    f(item);
                    Ok::<(), core::convert::Infallible>(())
                },
                limit,
            )
            .await
        {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`for_each_budgeted`](Self::for_each_budgeted).
    ///
    /// The first `Err` from `f` aborts the iteration and is returned;
    /// remaining elements are not visited. There is no retry and no
    /// partial-failure recovery.
    pub async fn try_for_each_budgeted<I, E>(
        &self,
        items: I,
        mut f: impl FnMut(I::Item) -> Result<(), E>,
        limit: Option<Duration>,
    ) -> Result<(), E>
    where
        I: IntoIterator,
    {
        let limit = limit.unwrap_or(self.inner.config.chunk_budget);
        let host = Rc::clone(self.host());
        let mut chunk_start = host.now();
        let mut deadline = chunk_start.saturating_add(limit);
        let mut processed = 0_usize;

        for item in items {
            let now = host.now();
            if now >= deadline {
                self.inner.tracer.borrow_mut().chunk_yield(&ChunkYieldEvent {
                    elapsed: now.saturating_duration_since(chunk_start),
                    processed,
                });
                self.yield_now().await;
                chunk_start = host.now();
                deadline = chunk_start.saturating_add(limit);
            }
            f(item)?;
            processed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::pin::pin;
    use core::task::Poll;

    use super::*;
    use crate::scheduler::YieldConfig;
    use crate::testhost::{TestHost, drive, poll_once};

    #[test]
    fn zero_budget_yields_before_every_element() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut fut = pin!(sched.for_each_budgeted(
            [1, 2, 3, 4, 5],
            move |n| s.borrow_mut().push(n),
            Some(Duration::ZERO),
        ));

        let mut yields = 0;
        loop {
            match poll_once(fut.as_mut()) {
                Poll::Ready(()) => break,
                Poll::Pending => {
                    yields += 1;
                    host.fire_frame();
                    host.run_timeouts();
                }
            }
        }
        assert_eq!(*seen.borrow(), [1, 2, 3, 4, 5]);
        assert_eq!(yields, 5, "a yield point before every element");
    }

    #[test]
    fn unbounded_budget_never_yields() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut fut = pin!(sched.for_each_budgeted(
            0..100,
            move |n| s.borrow_mut().push(n),
            Some(Duration::MAX),
        ));

        assert_eq!(
            poll_once(fut.as_mut()),
            Poll::Ready(()),
            "must complete in a single synchronous chunk"
        );
        assert_eq!(seen.borrow().len(), 100);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn yields_when_budget_elapses_and_resets_deadline() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        // Each element costs 6 ms against a 10 ms budget: chunks of two.
        let h = Rc::clone(&host);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut fut = pin!(sched.for_each_budgeted(
            [10, 20, 30, 40, 50],
            move |n| {
                s.borrow_mut().push(n);
                h.advance(Duration::from_millis(6));
            },
            Some(Duration::from_millis(10)),
        ));

        let mut yields = 0;
        loop {
            match poll_once(fut.as_mut()) {
                Poll::Ready(()) => break,
                Poll::Pending => {
                    yields += 1;
                    host.fire_frame();
                    host.run_timeouts();
                }
            }
        }
        assert_eq!(*seen.borrow(), [10, 20, 30, 40, 50]);
        assert_eq!(yields, 2, "12 ms chunks against a 10 ms budget");
    }

    #[test]
    fn error_aborts_remaining_elements() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut fut = pin!(sched.try_for_each_budgeted(
            [1, 2, 3, 4, 5],
            move |n| {
                s.borrow_mut().push(n);
                if n == 3 { Err("boom") } else { Ok(()) }
            },
            Some(Duration::MAX),
        ));

        let result = drive(&host, fut.as_mut());
        assert_eq!(result, Err("boom"));
        assert_eq!(*seen.borrow(), [1, 2, 3], "elements after the error are skipped");
    }

    #[test]
    fn empty_sequence_completes_without_yielding() {
        let host = TestHost::new();
        let sched = YieldScheduler::new(host.clone_dyn());

        let mut fut =
            pin!(sched.for_each_budgeted(core::iter::empty::<u8>(), |_| {}, Some(Duration::ZERO)));
        assert_eq!(poll_once(fut.as_mut()), Poll::Ready(()));
    }

    #[test]
    fn default_budget_is_three_frames() {
        assert_eq!(DEFAULT_CHUNK_BUDGET.as_millis(), 48);
        assert_eq!(
            YieldScheduler::new(TestHost::new().clone_dyn())
                .config()
                .chunk_budget,
            DEFAULT_CHUNK_BUDGET
        );
    }

    #[test]
    fn omitted_limit_uses_the_configured_budget() {
        let host = TestHost::new();
        let sched = YieldScheduler::with_config(
            host.clone_dyn(),
            YieldConfig {
                chunk_budget: Duration::from_millis(10),
                ..YieldConfig::web()
            },
        );

        // Same 6 ms elements as the explicit-limit test above: the 10 ms
        // budget must come out of the config.
        let h = Rc::clone(&host);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut fut = pin!(sched.for_each_budgeted(
            [10, 20, 30, 40, 50],
            move |n| {
                s.borrow_mut().push(n);
                h.advance(Duration::from_millis(6));
            },
            None,
        ));

        let mut yields = 0;
        loop {
            match poll_once(fut.as_mut()) {
                Poll::Ready(()) => break,
                Poll::Pending => {
                    yields += 1;
                    host.fire_frame();
                    host.run_timeouts();
                }
            }
        }
        assert_eq!(*seen.borrow(), [10, 20, 30, 40, 50]);
        assert_eq!(yields, 2, "chunking must follow the configured budget");
    }
}
