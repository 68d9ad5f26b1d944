//! Lexical Grammar
//!
//! Regular grammars for the pieces of a PAIRL record: intent lines, `@rid=`
//! tags, `key=value` tokens, evidence confidence, budget literals and ref
//! candidates. Everything here is stateless and total; "no match" is an
//! ordinary `None`, never an error.
//!
//! ## Intent grammar
//!
//! ```text
//! intent := name [ "{" args "}" ] [ " @rid=" rid ]
//! name   := [a-z0-9]{2,4} | segment ( "." segment )+
//! segment:= [a-z][a-z0-9_]*
//! rid    := [A-Za-z0-9]{1,8}
//! ```

use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// PATTERNS
// =============================================================================

static INTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[a-z0-9]{2,4}|[a-z][a-z0-9_]*(?:\.[a-z][a-z0-9_]*)+)(?:\{(?P<args>[^}]*)\})?(?: @rid=(?P<rid>[A-Za-z0-9]{1,8}))?$",
    )
    .unwrap()
});

static RID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@rid=([A-Za-z0-9]{1,8})$").unwrap());

/// Values stop at whitespace and at the arg delimiters so `a=x,b=y` is two tokens
static KEY_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z][a-z0-9_]*)=([^\s,;{}]+)").unwrap());

static CONFIDENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconf=(\d+(?:\.\d+)?)(?:[\s,;]|$)").unwrap());

static BUDGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)([A-Za-z]{1,16})$").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://").unwrap());

static HEX_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-fA-F0-9]{12,}").unwrap());

static REF_CANDIDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s=])(ref:\S*)").unwrap());

// =============================================================================
// MATCHERS
// =============================================================================

/// Captured groups of an intent record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentMatch<'a> {
    pub name: &'a str,
    pub args: Option<&'a str>,
    pub rid: Option<&'a str>,
}

/// Match a whole record line against the intent grammar
pub fn match_intent(line: &str) -> Option<IntentMatch<'_>> {
    let caps = INTENT_RE.captures(line)?;
    Some(IntentMatch {
        name: caps.name("name")?.as_str(),
        args: caps.name("args").map(|m| m.as_str()),
        rid: caps.name("rid").map(|m| m.as_str()),
    })
}

/// Trailing `@rid=` token of any record
pub fn match_rid(line: &str) -> Option<&str> {
    RID_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// All `key=value` tokens in `text`, in order of appearance
///
/// This is the single scanner behind intent-arg policy checks and
/// `#cost`/`#quota`/`#rule` field extraction.
pub fn key_values(text: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    KEY_VALUE_RE
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
}

/// First value bound to `key`, if any
pub fn value_of<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    key_values(text).find(|(k, _)| *k == key).map(|(_, v)| v)
}

/// The numeric literal of the first well-formed `conf=` token
pub fn find_confidence(text: &str) -> Option<&str> {
    CONFIDENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Split a budget header value into `(amount, currency)`
pub fn match_budget(value: &str) -> Option<(&str, &str)> {
    let caps = BUDGET_RE.captures(value)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

pub fn contains_url(text: &str) -> bool {
    URL_RE.is_match(text)
}

/// A run of at least 12 hex characters
pub fn contains_hex_run(text: &str) -> bool {
    HEX_RUN_RE.is_match(text)
}

/// Every `ref:` token that starts a word or follows `=`
pub fn ref_candidates(text: &str) -> impl Iterator<Item = &str> + '_ {
    REF_CANDIDATE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Non-negative decimal literal as used by `val=`, `conf=` and budgets
pub fn parse_decimal(literal: &str) -> Option<f64> {
    let is_decimal = !literal.is_empty()
        && !literal.starts_with('.')
        && !literal.ends_with('.')
        && literal.chars().all(|c| c.is_ascii_digit() || c == '.')
        && literal.matches('.').count() <= 1;
    if !is_decimal {
        return None;
    }
    literal.parse::<f64>().ok()
}
