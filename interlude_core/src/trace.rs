// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the yield scheduler.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler calls at each decision point. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;

use crate::host::Visibility;
use crate::time::Duration;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Which deferred-execution wrapper scheduled work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeferKind {
    /// `when_idle` — run during the next idle period.
    Idle,
    /// `next_frame` — run at the next visual frame.
    Frame,
    /// `after_paint` — run one tick after the next frame (or the fallback
    /// timer).
    AfterPaint,
    /// A debounced frame callback.
    Debounced,
}

/// Emitted when a yield is requested and its entry registered.
#[derive(Clone, Copy, Debug)]
pub struct YieldRequestedEvent {
    /// Registry size including the new entry.
    pub pending: usize,
    /// Page visibility at the time of the request.
    pub visibility: Visibility,
    /// Whether the native cooperative-yield primitive will be used.
    pub native: bool,
}

/// Emitted when a single yield resumes through the host mechanism.
#[derive(Clone, Copy, Debug)]
pub struct YieldResumedEvent {
    /// Registry size after removal of the resumed entry.
    pub remaining: usize,
}

/// Emitted when a lifecycle transition force-resumes the whole registry.
#[derive(Clone, Copy, Debug)]
pub struct ForcedSweepEvent {
    /// Number of entries resumed by the sweep.
    pub swept: usize,
}

/// Emitted when the chunked iteration engine hits its budget and yields.
#[derive(Clone, Copy, Debug)]
pub struct ChunkYieldEvent {
    /// Wall-clock time spent in the chunk that just ended.
    pub elapsed: Duration,
    /// Elements processed so far across all chunks of this call.
    pub processed: usize,
}

/// Emitted when a deferred-execution wrapper schedules work.
#[derive(Clone, Copy, Debug)]
pub struct DeferredScheduledEvent {
    /// Which wrapper scheduled the work.
    pub kind: DeferKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scheduler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a yield is requested.
    fn on_yield_requested(&mut self, e: &YieldRequestedEvent) {
        _ = e;
    }

    /// Called when a yield resumes through the host mechanism.
    fn on_yield_resumed(&mut self, e: &YieldResumedEvent) {
        _ = e;
    }

    /// Called after a forced-resume sweep.
    fn on_forced_sweep(&mut self, e: &ForcedSweepEvent) {
        _ = e;
    }

    /// Called when chunked iteration yields at a budget boundary.
    fn on_chunk_yield(&mut self, e: &ChunkYieldEvent) {
        _ = e;
    }

    /// Called when a deferred-execution wrapper schedules work.
    fn on_deferred_scheduled(&mut self, e: &DeferredScheduledEvent) {
        _ = e;
    }

    /// Called when a debounced call supersedes a still-pending one.
    fn on_debounce_superseded(&mut self) {}
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional boxed [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Emits a [`YieldRequestedEvent`].
    #[inline]
    pub fn yield_requested(&mut self, e: &YieldRequestedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_yield_requested(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`YieldResumedEvent`].
    #[inline]
    pub fn yield_resumed(&mut self, e: &YieldResumedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_yield_resumed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ForcedSweepEvent`].
    #[inline]
    pub fn forced_sweep(&mut self, e: &ForcedSweepEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_forced_sweep(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ChunkYieldEvent`].
    #[inline]
    pub fn chunk_yield(&mut self, e: &ChunkYieldEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_chunk_yield(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DeferredScheduledEvent`].
    #[inline]
    pub fn deferred_scheduled(&mut self, e: &DeferredScheduledEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_deferred_scheduled(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a debounce-superseded event.
    #[inline]
    pub fn debounce_superseded(&mut self) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_debounce_superseded();
        }
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<&'static str>>>,
    }

    impl TraceSink for Recorder {
        fn on_yield_requested(&mut self, _e: &YieldRequestedEvent) {
            self.events.borrow_mut().push("requested");
        }

        fn on_forced_sweep(&mut self, _e: &ForcedSweepEvent) {
            self.events.borrow_mut().push("sweep");
        }
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Recorder {
            events: Rc::clone(&events),
        };
        let mut tracer = Tracer::new(Box::new(sink));

        tracer.yield_requested(&YieldRequestedEvent {
            pending: 1,
            visibility: Visibility::Visible,
            native: false,
        });
        tracer.forced_sweep(&ForcedSweepEvent { swept: 1 });
        // Default no-op method: must not record anything.
        tracer.yield_resumed(&YieldResumedEvent { remaining: 0 });

        assert_eq!(*events.borrow(), ["requested", "sweep"]);
    }

    #[test]
    fn none_tracer_discards() {
        let mut tracer = Tracer::none();
        tracer.forced_sweep(&ForcedSweepEvent { swept: 3 });
    }
}
