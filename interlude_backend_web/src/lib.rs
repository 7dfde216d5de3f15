// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for interlude.
//!
//! This crate connects the platform-neutral scheduler in `interlude_core` to
//! the browser:
//!
//! - [`BrowserHost`]: [`Host`] over `requestAnimationFrame`,
//!   `requestIdleCallback`, `setTimeout` and `scheduler.yield()`, with timer
//!   polyfills for whatever the engine lacks
//! - [`dom`]: boundary helpers (image priority, deferred CSS, prefetch
//!   hints, two-stage node removal)
//! - [`patch`]: explicit deferred decorators for collector pushes
//!   ([`DeferredSink`]) and event listeners ([`wrap_listener`])
//!
//! [`Host`]: interlude_core::host::Host

#![no_std]

extern crate alloc;

pub mod dom;
mod host;
pub mod patch;
mod shim;

pub use host::BrowserHost;
pub use interlude_core::host::Host;
pub use patch::{DeferredSink, wrap_listener};

use interlude_core::time::HostTime;

/// Returns the current host time from `performance.now()`, in microsecond
/// ticks.
#[must_use]
pub fn now() -> HostTime {
    host::host_time_from_ms(host::performance_now())
}
