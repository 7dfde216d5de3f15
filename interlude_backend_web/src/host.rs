// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser implementation of the [`Host`] trait.
//!
//! [`BrowserHost`] maps the host contract onto `requestAnimationFrame`,
//! `requestIdleCallback`, `setTimeout` and `scheduler.yield()`. Each
//! capability is probed once at construction via [`js_sys::Reflect`] lookups
//! on the global object; a missing API degrades to the timer polyfills in
//! [`shim`](crate::shim), never to an error.
//!
//! Every scheduled JS closure is kept alive in a table keyed by its
//! browser-issued (or internally allocated) id and removes itself when it
//! fires, so neither fired nor cancelled callbacks leak.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::Document;

use interlude_core::host::{
    Continuation, FrameCallback, FrameHandle, Host, IdleCallback, IdleDeadline, Visibility,
};
use interlude_core::time::{Duration, HostTime};

use crate::shim;

// Direct global bindings instead of `web_sys::Window` methods — avoids
// fetching (and unwrapping) the Window object on every call. Each binding is
// only invoked after the capability probe confirmed the API exists (or, for
// timers, because `setTimeout` is universal).
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);

    #[wasm_bindgen(js_name = "requestIdleCallback")]
    fn request_idle_callback(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout_ms(callback: &JsValue, delay_ms: f64) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(id: i32);
}

/// The `scheduler` global and its `yield` method, captured at probe time.
///
/// `yield` must be called with `scheduler` as its receiver, so both are kept.
struct NativeYield {
    scheduler: JsValue,
    yield_fn: Function,
}

/// A registered "page went hidden or is unloading" hook.
///
/// The listener closures are kept so they can be removed again when the hook
/// fires; the continuation is taken out exactly once.
struct LifecycleHook {
    cb: RefCell<Option<Continuation>>,
    visibility: Closure<dyn FnMut()>,
    pagehide: Option<Closure<dyn FnMut()>>,
}

struct HostState {
    document: Document,
    native_frame: bool,
    native_idle: bool,
    native_yield: Option<NativeYield>,

    /// Live JS closures, keyed by the id the browser handed back.
    frames: RefCell<BTreeMap<i32, Closure<dyn FnMut(f64)>>>,
    idles: RefCell<BTreeMap<i32, Closure<dyn FnMut(web_sys::IdleDeadline)>>>,
    timers: RefCell<BTreeMap<i32, Closure<dyn FnMut()>>>,

    /// Pending `scheduler.yield()` continuations, keyed internally (promises
    /// have no browser-issued id).
    yields: RefCell<BTreeMap<u32, Closure<dyn FnMut(JsValue)>>>,
    next_yield: Cell<u32>,

    hooks: RefCell<BTreeMap<u32, LifecycleHook>>,
    next_hook: Cell<u32>,

    /// Fire target of the most recent polyfilled frame, for pacing.
    last_frame_target_ms: Cell<f64>,
}

impl HostState {
    /// Schedules a one-shot `setTimeout` and tracks its closure until it
    /// fires. Returns the timer id.
    fn schedule_timer(self: &Rc<Self>, delay_ms: f64, cb: Continuation) -> i32 {
        let state = Rc::clone(self);
        let id_slot = Rc::new(Cell::new(0_i32));
        let id_for_cb = Rc::clone(&id_slot);
        let mut cb = Some(cb);
        let closure = Closure::wrap(Box::new(move || {
            // Keep our own closure alive until this call returns.
            let _own = state.timers.borrow_mut().remove(&id_for_cb.get());
            if let Some(cb) = cb.take() {
                cb();
            }
        }) as Box<dyn FnMut()>);
        let id = set_timeout_ms(closure.as_ref().unchecked_ref(), delay_ms);
        id_slot.set(id);
        self.timers.borrow_mut().insert(id, closure);
        id
    }

    /// Fires lifecycle hook `id` if it is still registered, removing its
    /// listeners first.
    ///
    /// `needs_hidden` distinguishes `visibilitychange` (which also fires on
    /// the way back to visible, and must then leave the hook armed) from
    /// `pagehide` (always terminal).
    fn fire_hook(self: &Rc<Self>, id: u32, needs_hidden: bool) {
        if needs_hidden && !self.document.hidden() {
            return;
        }
        let Some(hook) = self.hooks.borrow_mut().remove(&id) else {
            return;
        };
        let _ = self.document.remove_event_listener_with_callback(
            "visibilitychange",
            hook.visibility.as_ref().unchecked_ref(),
        );
        if let (Some(window), Some(pagehide)) = (self.document.default_view(), &hook.pagehide) {
            let _ = window
                .remove_event_listener_with_callback("pagehide", pagehide.as_ref().unchecked_ref());
        }
        if let Some(cb) = hook.cb.borrow_mut().take() {
            cb();
        }
        // `hook` drops here, including the listener closure currently
        // executing; the glue frees it once the call returns.
    }
}

/// [`Host`] implementation over the browser's scheduling APIs.
///
/// Construct one per document and hand it to
/// [`YieldScheduler::new`](interlude_core::scheduler::YieldScheduler::new)
/// behind an `Rc`:
///
/// ```no_run
/// # use std::rc::Rc;
/// # use interlude_core::scheduler::YieldScheduler;
/// # use interlude_backend_web::BrowserHost;
/// # fn demo(document: web_sys::Document) {
/// let scheduler = YieldScheduler::new(Rc::new(BrowserHost::new(document)));
/// # }
/// ```
pub struct BrowserHost {
    state: Rc<HostState>,
}

impl core::fmt::Debug for BrowserHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BrowserHost")
            .field("native_frame", &self.state.native_frame)
            .field("native_idle", &self.state.native_idle)
            .field("native_yield", &self.state.native_yield.is_some())
            .finish_non_exhaustive()
    }
}

impl BrowserHost {
    /// Creates a host for `document`, probing the global object once for
    /// `requestAnimationFrame`, `requestIdleCallback` and `scheduler.yield`.
    #[must_use]
    pub fn new(document: Document) -> Self {
        let global = js_sys::global();
        Self {
            state: Rc::new(HostState {
                document,
                native_frame: has_global_function(&global, "requestAnimationFrame"),
                native_idle: has_global_function(&global, "requestIdleCallback"),
                native_yield: detect_scheduler_yield(&global),
                frames: RefCell::new(BTreeMap::new()),
                idles: RefCell::new(BTreeMap::new()),
                timers: RefCell::new(BTreeMap::new()),
                yields: RefCell::new(BTreeMap::new()),
                next_yield: Cell::new(0),
                hooks: RefCell::new(BTreeMap::new()),
                next_hook: Cell::new(0),
                last_frame_target_ms: Cell::new(0.0),
            }),
        }
    }

    /// The document this host observes for visibility and lifecycle.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.state.document
    }
}

impl Host for BrowserHost {
    fn now(&self) -> HostTime {
        host_time_from_ms(performance_now())
    }

    fn visibility(&self) -> Visibility {
        if self.state.document.hidden() {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    fn request_frame(&self, cb: FrameCallback) -> FrameHandle {
        if self.state.native_frame {
            let state = Rc::clone(&self.state);
            let id_slot = Rc::new(Cell::new(0_i32));
            let id_for_cb = Rc::clone(&id_slot);
            let mut cb = Some(cb);
            let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
                let _own = state.frames.borrow_mut().remove(&id_for_cb.get());
                if let Some(cb) = cb.take() {
                    cb(host_time_from_ms(timestamp_ms));
                }
            }) as Box<dyn FnMut(f64)>);
            let id = request_animation_frame(closure.as_ref().unchecked_ref());
            id_slot.set(id);
            self.state.frames.borrow_mut().insert(id, closure);
            FrameHandle(id)
        } else {
            let (delay, target) = shim::frame_polyfill_delay(
                performance_now(),
                self.state.last_frame_target_ms.get(),
            );
            self.state.last_frame_target_ms.set(target);
            let id = self
                .state
                .schedule_timer(delay, Box::new(move || cb(host_time_from_ms(performance_now()))));
            FrameHandle(id)
        }
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if self.state.native_frame {
            if self.state.frames.borrow_mut().remove(&handle.0).is_some() {
                cancel_animation_frame(handle.0);
            }
        } else if self.state.timers.borrow_mut().remove(&handle.0).is_some() {
            clear_timeout(handle.0);
        }
    }

    fn request_idle(&self, cb: IdleCallback) {
        if self.state.native_idle {
            let state = Rc::clone(&self.state);
            let id_slot = Rc::new(Cell::new(0_i32));
            let id_for_cb = Rc::clone(&id_slot);
            let mut cb = Some(cb);
            let closure = Closure::wrap(Box::new(move |deadline: web_sys::IdleDeadline| {
                let _own = state.idles.borrow_mut().remove(&id_for_cb.get());
                if let Some(cb) = cb.take() {
                    cb(IdleDeadline {
                        did_timeout: deadline.did_timeout(),
                        time_remaining: duration_from_ms(deadline.time_remaining()),
                    });
                }
            })
                as Box<dyn FnMut(web_sys::IdleDeadline)>);
            let id = request_idle_callback(closure.as_ref().unchecked_ref());
            id_slot.set(id);
            self.state.idles.borrow_mut().insert(id, closure);
        } else {
            // Synthesize the deadline the way the canonical shim does: fire
            // on the next tick with a 50 ms budget counted from now.
            let scheduled = performance_now();
            self.state.schedule_timer(
                1.0,
                Box::new(move || {
                    cb(IdleDeadline {
                        did_timeout: false,
                        time_remaining: duration_from_ms(shim::idle_time_remaining_ms(
                            performance_now(),
                            scheduled,
                        )),
                    });
                }),
            );
        }
    }

    fn set_timeout(&self, delay: Duration, cb: Continuation) {
        self.state.schedule_timer(duration_to_ms(delay), cb);
    }

    fn has_native_yield(&self) -> bool {
        self.state.native_yield.is_some()
    }

    fn request_yield(&self, cb: Continuation) {
        let Some(native) = &self.state.native_yield else {
            return;
        };
        let id = self.state.next_yield.get();
        self.state.next_yield.set(id.wrapping_add(1));

        let cb = Rc::new(RefCell::new(Some(cb)));
        let state = Rc::clone(&self.state);
        let cb_for_closure = Rc::clone(&cb);
        let closure = Closure::wrap(Box::new(move |_result: JsValue| {
            let _own = state.yields.borrow_mut().remove(&id);
            if let Some(cb) = cb_for_closure.borrow_mut().take() {
                cb();
            }
        }) as Box<dyn FnMut(JsValue)>);

        match native.yield_fn.call0(&native.scheduler) {
            Ok(value) => {
                let promise: Promise = value.unchecked_into();
                let _ = promise.then(&closure);
                self.state.yields.borrow_mut().insert(id, closure);
            }
            Err(_) => {
                // The probed primitive threw anyway; the continuation must
                // still fire, so hand it to a plain timer.
                drop(closure);
                if let Some(cb) = cb.borrow_mut().take() {
                    self.state.schedule_timer(0.0, cb);
                }
            }
        }
    }

    fn on_hidden(&self, cb: Continuation) {
        let id = self.state.next_hook.get();
        self.state.next_hook.set(id.wrapping_add(1));

        let state = Rc::clone(&self.state);
        let visibility =
            Closure::wrap(Box::new(move || state.fire_hook(id, true)) as Box<dyn FnMut()>);
        let _ = self.state.document.add_event_listener_with_callback(
            "visibilitychange",
            visibility.as_ref().unchecked_ref(),
        );

        let pagehide = self.state.document.default_view().map(|window| {
            let state = Rc::clone(&self.state);
            let hide =
                Closure::wrap(Box::new(move || state.fire_hook(id, false)) as Box<dyn FnMut()>);
            let _ = window
                .add_event_listener_with_callback("pagehide", hide.as_ref().unchecked_ref());
            hide
        });

        self.state.hooks.borrow_mut().insert(
            id,
            LifecycleHook {
                cb: RefCell::new(Some(cb)),
                visibility,
                pagehide,
            },
        );
    }
}

fn has_global_function(global: &js_sys::Object, name: &str) -> bool {
    Reflect::get(global, &JsValue::from_str(name)).is_ok_and(|v| v.is_function())
}

fn detect_scheduler_yield(global: &js_sys::Object) -> Option<NativeYield> {
    let scheduler = Reflect::get(global, &JsValue::from_str("scheduler")).ok()?;
    if !scheduler.is_object() {
        return None;
    }
    let yield_fn = Reflect::get(&scheduler, &JsValue::from_str("yield"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    Some(NativeYield {
        scheduler,
        yield_fn,
    })
}

/// Converts a `DOMHighResTimeStamp` (ms) to microsecond [`HostTime`] ticks.
pub(crate) fn host_time_from_ms(ms: f64) -> HostTime {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "DOMHighResTimeStamp is a small positive f64; µs fits in u64"
    )]
    let us = (ms.max(0.0) * 1000.0) as u64;
    HostTime(us)
}

pub(crate) fn duration_from_ms(ms: f64) -> Duration {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "idle budgets are small positive f64 values; µs fits in u64"
    )]
    let us = (ms.max(0.0) * 1000.0) as u64;
    Duration(us)
}

fn duration_to_ms(delay: Duration) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "setTimeout delays lose nothing meaningful at f64 precision"
    )]
    let us = delay.0 as f64;
    us / 1000.0
}
