// Copyright 2026 the Interlude Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classification policy for event-listener interception.
//!
//! Decides which listener registrations should be deferred behind a yield.
//! The decision needs three inputs: the event type, who is registering
//! (callers pass an explicit [`ListenerOrigin`] — inferring ownership from a
//! stack trace is too fragile to build on), and an optional substring
//! pattern matched against a caller-supplied source hint such as a script
//! URL.
//!
//! The policy is pure data; the web backend's `wrap_listener` applies it and
//! does the actual wrapping.

use alloc::string::String;
use alloc::vec::Vec;

/// Who is registering a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerOrigin {
    /// The host page's own code. Left alone unless the pattern matches.
    FirstParty,
    /// Embedded third-party code (tag managers, analytics, widgets).
    ThirdParty,
}

/// Which listener registrations get deferred behind a yield.
#[derive(Clone, Debug, Default)]
pub struct InterceptPolicy {
    types: Vec<String>,
    pattern: Option<String>,
}

impl InterceptPolicy {
    /// A policy deferring the given event types for third-party origins.
    #[must_use]
    pub fn new(types: impl IntoIterator<Item = String>) -> Self {
        Self {
            types: types.into_iter().collect(),
            pattern: None,
        }
    }

    /// Additionally defers first-party registrations whose source hint
    /// contains `pattern`.
    #[must_use]
    pub fn with_pattern(mut self, pattern: String) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// The event types this policy covers.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Whether a registration should be deferred behind a yield.
    ///
    /// `source_hint` describes the registration site (e.g. the script URL
    /// the caller knows it came from); it is only consulted when a pattern
    /// is configured.
    #[must_use]
    pub fn should_defer(
        &self,
        event_type: &str,
        origin: ListenerOrigin,
        source_hint: Option<&str>,
    ) -> bool {
        if !self.types.iter().any(|t| t == event_type) {
            return false;
        }
        match origin {
            ListenerOrigin::ThirdParty => true,
            ListenerOrigin::FirstParty => match (&self.pattern, source_hint) {
                (Some(pattern), Some(hint)) => hint.contains(pattern.as_str()),
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString as _;
    use alloc::vec;

    use super::*;

    fn policy() -> InterceptPolicy {
        InterceptPolicy::new(vec!["click".to_string(), "scroll".to_string()])
    }

    #[test]
    fn uncovered_event_type_passes_through() {
        let p = policy();
        assert!(!p.should_defer("keydown", ListenerOrigin::ThirdParty, None));
    }

    #[test]
    fn third_party_covered_type_is_deferred() {
        let p = policy();
        assert!(p.should_defer("click", ListenerOrigin::ThirdParty, None));
        assert!(p.should_defer("scroll", ListenerOrigin::ThirdParty, None));
    }

    #[test]
    fn first_party_passes_unless_pattern_matches() {
        let p = policy();
        assert!(!p.should_defer("click", ListenerOrigin::FirstParty, None));

        let p = policy().with_pattern("tag-manager".to_string());
        assert!(p.should_defer(
            "click",
            ListenerOrigin::FirstParty,
            Some("https://cdn.example/tag-manager.js"),
        ));
        assert!(!p.should_defer(
            "click",
            ListenerOrigin::FirstParty,
            Some("https://cdn.example/app.js"),
        ));
        assert!(
            !p.should_defer("click", ListenerOrigin::FirstParty, None),
            "no hint, no match"
        );
    }
}
