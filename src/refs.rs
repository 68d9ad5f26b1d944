//! Ref Validator
//!
//! A ref points at external or in-message material:
//!
//! ```text
//! ref:<ns>:<id>[#fragment]          short form
//! ref:<ns>:<type>:<id>[#fragment]   long form, <id> may contain ':'
//! ```
//!
//! Used by the `#ref` record rule, the `@deps` header and any header whose
//! value starts with `ref:`.

use regex::Regex;
use std::sync::LazyLock;

static NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

static FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,8}$").unwrap());

const PREFIX: &str = "ref:";

/// Components of a well-formed ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefParts {
    pub ns: String,
    /// Present only in long form
    pub kind: Option<String>,
    pub id: String,
    pub fragment: Option<String>,
}

impl RefParts {
    pub fn is_long_form(&self) -> bool {
        self.kind.is_some()
    }
}

impl std::fmt::Display for RefParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ref:{}:", self.ns)?;
        if let Some(kind) = &self.kind {
            write!(f, "{}:", kind)?;
        }
        f.write_str(&self.id)?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// Check a value against the ref grammar
pub fn is_valid_ref(value: &str) -> bool {
    parse_ref(value).is_some()
}

/// Split a ref into its parts, or `None` if it is malformed
pub fn parse_ref(value: &str) -> Option<RefParts> {
    if value.chars().any(char::is_whitespace) || !value.starts_with(PREFIX) {
        return None;
    }

    // Last '#' wins
    let (main, fragment) = match value.rsplit_once('#') {
        Some((main, fragment)) => {
            if !FRAGMENT_RE.is_match(fragment) {
                return None;
            }
            (main, Some(fragment.to_string()))
        }
        None => (value, None),
    };

    let parts: Vec<&str> = main.split(':').collect();
    if parts.len() < 3 || parts[0] != "ref" {
        return None;
    }

    let ns = parts[1];
    if !NAMESPACE_RE.is_match(ns) {
        return None;
    }

    let payload = &parts[2..];
    let (kind, id) = if payload.len() == 1 {
        (None, payload[0].to_string())
    } else {
        let kind = payload[0];
        if !TYPE_RE.is_match(kind) {
            return None;
        }
        (Some(kind.to_string()), payload[1..].join(":"))
    };

    if id.is_empty() {
        return None;
    }

    Some(RefParts {
        ns: ns.to_string(),
        kind,
        id,
        fragment,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // -- Strategy helpers --

    fn arb_ns() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,12}"
    }

    fn arb_kind() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z0-9_.-]{1,12}")
    }

    fn arb_fragment() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z0-9_-]{1,8}")
    }

    fn arb_candidate() -> impl Strategy<Value = String> {
        prop_oneof![
            "ref:[A-Za-z0-9_:#.-]{0,24}",
            "ref:[ -~]{0,24}",
            "[ -~]{0,24}",
        ]
    }

    proptest! {
        /// Anything the validator accepts must survive being rebuilt from its parts.
        #[test]
        fn accepted_refs_round_trip(value in arb_candidate()) {
            if let Some(parts) = parse_ref(&value) {
                let rebuilt = parts.to_string();
                prop_assert_eq!(&rebuilt, &value);
                prop_assert_eq!(parse_ref(&rebuilt), Some(parts));
            }
        }

        #[test]
        fn generated_refs_are_accepted(
            ns in arb_ns(),
            kind in arb_kind(),
            id in "[A-Za-z0-9_.-]{1,12}",
            fragment in arb_fragment(),
        ) {
            let parts = RefParts { ns, kind, id, fragment };
            let text = parts.to_string();
            prop_assert!(is_valid_ref(&text));
            prop_assert_eq!(parse_ref(&text), Some(parts));
        }
    }
}
