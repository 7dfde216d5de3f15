// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative yield scheduling for a single busy main thread.
//!
//! `interlude_core` keeps a page responsive while it performs costly work by
//! deciding when a unit of work must pause and hand control back to the
//! host's rendering and input pipeline, and when it is safe to resume. It is
//! `no_std` compatible (with `alloc`) and holds all policy; platform glue
//! lives in backend crates implementing the [`Host`](host::Host) trait.
//!
//! # Architecture
//!
//! Every operation funnels through the yield scheduler and its suspension
//! registry:
//!
//! ```text
//!   caller (wrapper / budgeted iteration / debounce)
//!       │
//!       ▼
//!   YieldScheduler::yield_now() ──► SuspensionRegistry (PendingYield)
//!       │                                   ▲
//!       ▼                                   │ force-resume sweep
//!   Host primitive fires ◄── frame / idle / timer / native yield
//!                                           │
//!                              page hidden or being torn down
//! ```
//!
//! **[`host`]** — The [`Host`](host::Host) trait backends implement:
//! frames, idle periods, timers, native cooperative yield, visibility, and
//! the one-shot lifecycle hook. Capabilities degrade to polyfills inside the
//! backend, never to errors.
//!
//! **[`registry`]** — Suspension bookkeeping: add once, resume at most once,
//! sweep in registration order within one synchronous pass.
//!
//! **[`scheduler`]** — [`YieldScheduler`](scheduler::YieldScheduler):
//! hidden-page immediate resolution, lifecycle-armed forced sweeps, native
//! yield with a frame-then-tick fallback, and per-instance
//! [`YieldConfig`](scheduler::YieldConfig).
//!
//! **[`defer`]** — Run-when-idle, run-at-next-frame, and run-after-paint
//! wrappers returning [`Deferred`](defer::Deferred) futures.
//!
//! **[`chunk`]** — Budgeted iteration: in-order, exactly-once application
//! with a wall-clock budget per chunk.
//!
//! **[`debounce`]** — Coalesces rapid repeated calls into at most one
//! execution per frame.
//!
//! **[`intercept`]** — Pure classification policy for deferring third-party
//! listener registrations.
//!
//! **[`time`]** — Microsecond [`HostTime`](time::HostTime) and
//! [`Duration`](time::Duration).
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! scheduler instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Concurrency model
//!
//! Single-threaded and cooperative: "concurrency" is interleaving of
//! deferred continuations on one thread. Nothing blocks; everything that
//! waits does so by parking in the registry and being re-invoked by a host
//! callback. `Rc`/`Cell`/`RefCell` are sufficient; nothing is `Send`.
//!
//! Relative resumption order across *different* pending yields follows
//! whatever order the underlying host mechanisms fire, except during a
//! forced sweep, where all of them resume in registration order within the
//! same synchronous pass.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod chunk;
pub mod debounce;
pub mod defer;
pub mod host;
pub mod intercept;
pub mod registry;
pub mod scheduler;
pub mod time;
pub mod trace;

#[cfg(test)]
mod testhost;
