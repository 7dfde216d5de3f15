// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred wrappers around third-party entry points.
//!
//! Two explicit decorators replace the usual monkey-patching approach:
//!
//! - [`DeferredSink`] wraps a push-style collector method (an analytics
//!   `dataLayer.push`, say) so each call is forwarded after a yield instead
//!   of running its processing chain synchronously on the caller's stack.
//! - [`wrap_listener`] wraps an event listener per an
//!   [`InterceptPolicy`](interlude_core::intercept::InterceptPolicy) so the
//!   listener body runs after a yield while the event object still carries
//!   the target it had at dispatch time.
//!
//! Both take the functions to wrap explicitly; callers decide what gets
//! decorated and with which [`ListenerOrigin`], because ownership of a
//! registration is something only the integrating page actually knows.

use alloc::boxed::Box;

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::Event;

use interlude_core::intercept::{InterceptPolicy, ListenerOrigin};
use interlude_core::scheduler::YieldScheduler;

/// A push-style collector method decoupled from its callers.
///
/// [`push`](Self::push) returns immediately; the underlying method runs with
/// the same arguments, in per-call order, once the scheduler's yield fires.
/// An exception thrown by the underlying method at that point has no caller
/// to propagate to and is swallowed, matching what an async forwarder's
/// unhandled rejection would do.
pub struct DeferredSink {
    scheduler: YieldScheduler,
    target: Object,
    method: Function,
}

impl core::fmt::Debug for DeferredSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeferredSink").finish_non_exhaustive()
    }
}

impl DeferredSink {
    /// Wraps `target[method]`, which must be a function.
    pub fn wrap(
        scheduler: &YieldScheduler,
        target: &Object,
        method: &str,
    ) -> Result<Self, JsValue> {
        let method = Reflect::get(target, &JsValue::from_str(method))?.dyn_into::<Function>()?;
        Ok(Self {
            scheduler: scheduler.clone(),
            target: target.clone(),
            method,
        })
    }

    /// Queues one call; the wrapped method receives `args` after a yield.
    ///
    /// Calls queued while the page is visible interleave with other deferred
    /// work, but two `push` calls never swap places relative to each other:
    /// yields resume in registration order whenever a sweep is involved, and
    /// the fallback timers fire FIFO otherwise.
    pub fn push(&self, args: Array) {
        let target = self.target.clone();
        let method = self.method.clone();
        self.scheduler.yield_with(move || {
            let _ = method.apply(&target, &args);
        });
    }
}

/// Wraps `listener` so its body runs after a yield, if `policy` says this
/// registration should be deferred; otherwise returns `listener` unchanged.
///
/// The returned function is what should be passed to `addEventListener`.
/// Because the real listener runs outside the dispatch, the event's `target`
/// and `currentTarget` (which the browser nulls out after dispatch ends) are
/// pinned to their dispatch-time values first, and the listener is invoked
/// with `currentTarget` as its receiver, as a directly registered listener
/// would be. If the event refuses the pinning (a non-configurable property),
/// the listener runs during dispatch instead, while the event still carries
/// its targets.
///
/// `origin` states who owns the registration and `source_hint` optionally
/// names where it came from (a script URL); both feed the policy unchanged.
#[must_use]
pub fn wrap_listener(
    scheduler: &YieldScheduler,
    policy: &InterceptPolicy,
    event_type: &str,
    origin: ListenerOrigin,
    source_hint: Option<&str>,
    listener: Function,
) -> Function {
    if !policy.should_defer(event_type, origin, source_hint) {
        return listener;
    }
    let scheduler = scheduler.clone();
    let closure = Closure::wrap(Box::new(move |event: Event| {
        let current_target = event.current_target().map_or(JsValue::NULL, JsValue::from);
        let target = event.target().map_or(JsValue::NULL, JsValue::from);
        let pinned = pin_event_targets(&event, &target, &current_target);

        let listener = listener.clone();
        let run = move || {
            let _ = listener.call1(&current_target, &event);
        };
        match dispatch_for(pinned) {
            ListenerDispatch::Deferred => scheduler.yield_with(run),
            ListenerDispatch::Immediate => run(),
        }
    }) as Box<dyn FnMut(Event)>);
    // Hand the closure to the JS garbage collector; it lives exactly as long
    // as the registration that holds it.
    closure.into_js_value().unchecked_into()
}

/// How one invocation of a wrapped listener runs.
#[derive(Debug, PartialEq, Eq)]
enum ListenerDispatch {
    /// The dispatch-time targets are pinned; running after a yield is safe.
    Deferred,
    /// Pinning failed; defer nothing, the post-dispatch event would carry
    /// nulled targets.
    Immediate,
}

fn dispatch_for(pinned: Result<(), JsValue>) -> ListenerDispatch {
    match pinned {
        Ok(()) => ListenerDispatch::Deferred,
        Err(_) => ListenerDispatch::Immediate,
    }
}

/// Redefines `target` and `currentTarget` as plain read-only properties
/// holding the given dispatch-time values, so a listener running after
/// dispatch still sees them.
fn pin_event_targets(
    event: &Event,
    target: &JsValue,
    current_target: &JsValue,
) -> Result<(), JsValue> {
    let object: &Object = event.unchecked_ref();
    for (key, value) in [("target", target), ("currentTarget", current_target)] {
        let key = JsValue::from_str(key);
        let descriptor = Object::new();
        Reflect::set(&descriptor, &JsValue::from_str("value"), value)?;
        Reflect::set(
            &descriptor,
            &JsValue::from_str("configurable"),
            &JsValue::TRUE,
        )?;
        if !Reflect::define_property(object, &key, &descriptor)? {
            return Err(JsValue::from_str("event property is not configurable"));
        }
    }
    Ok(())
}

/// Convenience for building the argument [`Array`] a [`DeferredSink`]
/// forwards, from any iterable of JS values.
#[must_use]
pub fn args_from(values: impl IntoIterator<Item = JsValue>) -> Array {
    values.into_iter().collect()
}
