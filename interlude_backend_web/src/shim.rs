// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Polyfill arithmetic for missing browser scheduling APIs.
//!
//! When `requestAnimationFrame` or `requestIdleCallback` is absent (ancient
//! engines, some worker contexts), [`BrowserHost`] falls back to timers and
//! computes the pacing here. The math is kept free of `web-sys` so it can be
//! tested natively.
//!
//! [`BrowserHost`]: crate::BrowserHost

/// Nominal frame interval for the `requestAnimationFrame` polyfill,
/// simulating a 60 Hz display.
pub(crate) const FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

/// Synthesized idle budget for the `requestIdleCallback` polyfill, matching
/// the 50 ms cap browsers use for real idle deadlines.
pub(crate) const IDLE_BUDGET_MS: f64 = 50.0;

/// Computes the timer delay and fire target for one polyfilled frame.
///
/// Frames are paced at least [`FRAME_INTERVAL_MS`] apart from the previous
/// frame's *computed fire time*, not from when the request was made, so a
/// burst of requests still spreads across distinct ticks. Returns
/// `(delay_ms, target_ms)`; the caller stores `target_ms` as the next call's
/// `last_target_ms`.
pub(crate) fn frame_polyfill_delay(now_ms: f64, last_target_ms: f64) -> (f64, f64) {
    let delay = (last_target_ms + FRAME_INTERVAL_MS - now_ms).max(0.0);
    (delay, now_ms + delay)
}

/// Time remaining in a synthesized idle period that was scheduled at
/// `scheduled_ms` and is firing at `now_ms`.
pub(crate) fn idle_time_remaining_ms(now_ms: f64, scheduled_ms: f64) -> f64 {
    (IDLE_BUDGET_MS - (now_ms - scheduled_ms)).max(0.0)
}
