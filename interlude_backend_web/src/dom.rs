// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM boundary helpers.
//!
//! Small page-level optimizations built on the deferred-execution wrappers:
//! each one does the cheap, perception-critical part synchronously and pushes
//! the layout- or network-affecting rest behind the scheduler.
//!
//! Failures are browser exceptions surfaced as `JsValue`; helpers whose
//! deferred part can fail resolve to a `Result` instead of failing the
//! initial call.

use alloc::string::String;
use alloc::vec::Vec;

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlLinkElement};

use interlude_core::defer::Deferred;
use interlude_core::scheduler::YieldScheduler;

/// Attribute writes that mark an element as high-priority for loading.
///
/// Absolute assignments, not accumulations: reapplying them leaves an
/// element in the same final state.
pub(crate) const EAGER_LOAD_ATTRS: [(&str, &str); 2] =
    [("loading", "eager"), ("fetchpriority", "high")];

/// Marks every element matching `selector` as high-priority for loading.
///
/// Sets `loading="eager"` and `fetchpriority="high"`, typically on the
/// above-the-fold images a lazy-loading default would otherwise starve. Runs
/// synchronously; it only flips attributes, so calling it again (or on zero
/// matches) is harmless.
pub fn prioritize_images(document: &Document, selector: &str) -> Result<(), JsValue> {
    let nodes = document.query_selector_all(selector)?;
    for i in 0..nodes.length() {
        if let Some(node) = nodes.get(i)
            && let Some(element) = node.dyn_ref::<Element>()
        {
            for (attribute, value) in EAGER_LOAD_ATTRS {
                element.set_attribute(attribute, value)?;
            }
        }
    }
    Ok(())
}

/// Loads a stylesheet without blocking first render.
///
/// The `<link>` is created immediately but scoped to `media="print"`, which
/// browsers fetch at low priority without blocking paint. During the next
/// idle period it is appended to `<head>` and flipped to `media="all"`,
/// applying the styles.
pub fn load_deferred_css(
    scheduler: &YieldScheduler,
    document: &Document,
    href: &str,
) -> Result<Deferred<Result<(), JsValue>>, JsValue> {
    let link: HtmlLinkElement = document.create_element("link")?.unchecked_into();
    link.set_rel("stylesheet");
    link.set_href(href);
    link.set_media("print");

    let document = document.clone();
    Ok(scheduler.when_idle(move || -> Result<(), JsValue> {
        let head = document
            .head()
            .ok_or_else(|| JsValue::from_str("document has no <head>"))?;
        head.append_child(&link)?;
        link.set_media("all");
        Ok(())
    }))
}

/// Injects `<link rel="prefetch">` hints for `urls` during the next idle
/// period, warming the cache for likely navigations without competing with
/// the current page's own loading.
pub fn prefetch_resources(
    scheduler: &YieldScheduler,
    document: &Document,
    urls: Vec<String>,
) -> Deferred<Result<(), JsValue>> {
    let document = document.clone();
    scheduler.when_idle(move || -> Result<(), JsValue> {
        let head = document
            .head()
            .ok_or_else(|| JsValue::from_str("document has no <head>"))?;
        for url in &urls {
            let link: HtmlLinkElement = document.create_element("link")?.unchecked_into();
            link.set_rel("prefetch");
            link.set_href(url);
            head.append_child(&link)?;
        }
        Ok(())
    })
}

/// Removes `element` from the document in two stages: hidden immediately
/// (cheap style write, instant visual effect), detached from the tree during
/// the next idle period (the part that invalidates layout).
pub fn remove_node(
    scheduler: &YieldScheduler,
    element: HtmlElement,
) -> Result<Deferred<()>, JsValue> {
    element.style().set_property("display", "none")?;
    Ok(scheduler.when_idle(move || element.remove()))
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;

    use super::*;

    #[test]
    fn eager_policy_covers_loading_and_fetch_priority() {
        assert_eq!(
            EAGER_LOAD_ATTRS,
            [("loading", "eager"), ("fetchpriority", "high")]
        );
    }

    #[test]
    fn applying_the_policy_twice_matches_applying_it_once() {
        // An element that starts lazy, with an unrelated attribute present.
        let mut attributes = BTreeMap::from([("loading", "lazy"), ("decoding", "async")]);

        for (attribute, value) in EAGER_LOAD_ATTRS {
            attributes.insert(attribute, value);
        }
        let after_once = attributes.clone();

        for (attribute, value) in EAGER_LOAD_ATTRS {
            attributes.insert(attribute, value);
        }
        assert_eq!(
            attributes, after_once,
            "attribute writes are absolute, not accumulative"
        );
        assert_eq!(attributes.get("loading"), Some(&"eager"));
        assert_eq!(attributes.get("decoding"), Some(&"async"));
    }
}
