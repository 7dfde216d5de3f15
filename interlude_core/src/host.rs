// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform integrations.
//!
//! Interlude splits platform-specific work into *backend* crates. A backend
//! implements [`Host`] over the scheduling primitives its platform provides:
//!
//! - **Frames** — a periodic "next visual frame" notifier
//!   (`requestAnimationFrame` on the web, or a ~16 ms timer polyfill).
//! - **Idle periods** — a "call me when nothing better is pending" notifier
//!   (`requestIdleCallback`, or an immediate timer polyfill that synthesizes
//!   an [`IdleDeadline`]).
//! - **Cooperative yield** — a native low-priority continuation mechanism
//!   (`scheduler.yield()`), if the platform exposes one. Hosts without it
//!   report [`has_native_yield`](Host::has_native_yield) = `false` and the
//!   scheduler approximates the yield with a frame followed by a timer tick.
//! - **Timers** — plain one-shot timeouts.
//! - **Lifecycle** — a one-shot "the page went hidden or is being torn down"
//!   hook used to force-resume suspended work.
//!
//! None of these can fail; a missing capability degrades to a polyfill inside
//! the backend, never to an error. All callbacks fire on the single
//! cooperative thread, so implementations use interior mutability rather than
//! locks.

use alloc::boxed::Box;

use crate::time::{Duration, HostTime};

/// Whether the page is currently visible to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// The page is at least partially visible; deferring work matters.
    Visible,
    /// The page is hidden; the user cannot perceive jank, and frame/idle
    /// callbacks may not fire at all.
    Hidden,
}

/// Identifies a pending frame request so it can be cancelled.
///
/// The value is host-defined (the `requestAnimationFrame` id on the web, or a
/// timer id under the polyfill) and is only meaningful to the host that
/// issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Snapshot of the idle budget passed to an idle callback.
///
/// Mirrors the web's `IdleDeadline`: under the polyfill, `did_timeout` is
/// always `false` and `time_remaining` is `max(0, 50ms − elapsed since
/// scheduling)`, captured when the callback fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdleDeadline {
    /// Whether the callback fired because a deadline elapsed rather than
    /// because the thread went idle.
    pub did_timeout: bool,
    /// Estimated time remaining in the current idle period.
    pub time_remaining: Duration,
}

/// A frame callback; receives the host time of the frame.
pub type FrameCallback = Box<dyn FnOnce(HostTime)>;

/// An idle callback; receives the idle budget snapshot.
pub type IdleCallback = Box<dyn FnOnce(IdleDeadline)>;

/// A bare continuation with no payload.
pub type Continuation = Box<dyn FnOnce()>;

/// Scheduling primitives provided by the platform.
///
/// Implementations are expected to be cheap to call and must invoke every
/// accepted callback at most once, asynchronously with respect to the
/// requesting call (the deterministic test host fires them on demand
/// instead). Hosts are shared behind `Rc`, hence the `&self` receivers and
/// interior mutability.
pub trait Host {
    /// Returns the current host time.
    fn now(&self) -> HostTime;

    /// Returns the current page visibility.
    fn visibility(&self) -> Visibility;

    /// Schedules `cb` for the next visual frame and returns a handle that
    /// [`cancel_frame`](Self::cancel_frame) accepts.
    fn request_frame(&self, cb: FrameCallback) -> FrameHandle;

    /// Cancels a pending frame request.
    ///
    /// Cancelling a handle that already fired (or was already cancelled) is a
    /// no-op.
    fn cancel_frame(&self, handle: FrameHandle);

    /// Schedules `cb` for the next idle period.
    fn request_idle(&self, cb: IdleCallback);

    /// Schedules `cb` to run after at least `delay`.
    ///
    /// `Duration::ZERO` means "next timer tick": as soon as possible, but
    /// never synchronously.
    fn set_timeout(&self, delay: Duration, cb: Continuation);

    /// Whether the platform has a native cooperative-yield primitive.
    ///
    /// When this returns `false`, [`request_yield`](Self::request_yield) must
    /// not be called; the scheduler falls back to a frame followed by a timer
    /// tick.
    fn has_native_yield(&self) -> bool;

    /// Schedules `cb` via the native cooperative-yield primitive.
    fn request_yield(&self, cb: Continuation);

    /// Registers a one-shot hook fired when the page becomes hidden or is
    /// being torn down, whichever happens first.
    ///
    /// The hook fires at most once and the host cleans up its own listeners
    /// afterwards. Registering a new hook after the previous one fired arms
    /// the lifecycle events again.
    fn on_hidden(&self, cb: Continuation);
}
