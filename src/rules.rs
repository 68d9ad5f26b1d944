//! Validation Rules
//!
//! Each rule reads a parsed [`Message`] and returns a [`RuleOutcome`]; none
//! of them mutates the message. The engine decides ordering and merges the
//! findings.
//!
//! ## Rule Codes
//!
//! | Code | Rule |
//! |------|------|
//! | V0   | Required headers (`@v`, `@mid`, `@ts`), fatal gate |
//! | I001 | Intent record syntax |
//! | V1   | No new facts in intent args |
//! | V2   | Evidence records |
//! | V3   | Refs in `#ref` records and headers |
//! | V6   | RID uniqueness |
//! | C001 | `#cost` / `#quota` fields |
//! | V8   | Budget |

use std::collections::HashSet;

use crate::config::ValidationOptions;
use crate::diagnostics::{Finding, RuleCode, Severity};
use crate::engine::{budget_status, BudgetStatus};
use crate::grammar;
use crate::message::{Directive, Message, Record};
use crate::refs::is_valid_ref;

pub const REQUIRED_HEADERS: [&str; 3] = ["v", "mid", "ts"];

/// Intent arg keys whose values may legitimately carry digits
pub const NUMERIC_ARG_WHITELIST: [&str; 2] = ["l", "m"];

// =============================================================================
// RULE PLUMBING
// =============================================================================

/// Per-run facts shared by all rules
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub options: &'a ValidationOptions,
    /// Strict mode and a `#rule no_new_facts=true` directive are both present
    pub no_new_facts_enforced: bool,
    /// Computed once; the budget rule reports it and the engine stores it
    pub budget: BudgetStatus,
}

impl<'a> RuleContext<'a> {
    pub fn new(message: &Message, options: &'a ValidationOptions) -> Self {
        Self {
            options,
            no_new_facts_enforced: options.strict && declares_no_new_facts(message),
            budget: budget_status(message, options.projected_cost),
        }
    }
}

/// What a rule found
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub findings: Vec<Finding>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            findings: vec![],
        }
    }

    /// Passed iff none of the findings is an error
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        Self {
            passed: !findings.iter().any(Finding::is_error),
            findings,
        }
    }
}

pub type RuleFn = fn(&Message, &RuleContext<'_>) -> RuleOutcome;

/// Every rule after the required-headers gate, in execution order
pub const RULES: [(RuleCode, RuleFn); 7] = [
    (RuleCode::IntentSyntax, intent_syntax),
    (RuleCode::NoNewFacts, no_new_facts),
    (RuleCode::Evidence, evidence),
    (RuleCode::Refs, refs),
    (RuleCode::RidUniqueness, rid_uniqueness),
    (RuleCode::CostQuota, cost_quota_fields),
    (RuleCode::Budget, budget),
];

fn declares_no_new_facts(message: &Message) -> bool {
    message
        .records()
        .iter()
        .filter_map(|r| r.directive("rule"))
        .any(|d| grammar::key_values(&d.raw).any(|kv| kv == ("no_new_facts", "true")))
}

fn directives<'m>(
    message: &'m Message,
    kind: &'m str,
) -> impl Iterator<Item = (usize, &'m Directive)> + 'm {
    message
        .records()
        .iter()
        .enumerate()
        .filter_map(move |(i, r)| r.directive(kind).map(|d| (i, d)))
}

// =============================================================================
// V0: REQUIRED HEADERS
// =============================================================================

pub fn required_headers(message: &Message, _ctx: &RuleContext<'_>) -> RuleOutcome {
    let findings = REQUIRED_HEADERS
        .iter()
        .filter(|key| message.header(key).is_none())
        .map(|key| {
            Finding::error(
                RuleCode::RequiredHeaders,
                format!("Missing required header: @{}", key),
            )
        })
        .collect();
    RuleOutcome::from_findings(findings)
}

// =============================================================================
// INTENT SYNTAX
// =============================================================================

pub fn intent_syntax(message: &Message, _ctx: &RuleContext<'_>) -> RuleOutcome {
    let findings = message
        .records()
        .iter()
        .enumerate()
        .filter_map(|(i, record)| match record {
            Record::Malformed(raw) => Some(
                Finding::error(
                    RuleCode::IntentSyntax,
                    format!(
                        "Invalid intent record (expected name[{{args}}][ @rid=id]): {}",
                        raw
                    ),
                )
                .at_record(i),
            ),
            _ => None,
        })
        .collect();
    RuleOutcome::from_findings(findings)
}

// =============================================================================
// V1: NO NEW FACTS
// =============================================================================

/// Intent args carry intent, not facts: no URLs, hashes or numbers.
///
/// Findings are warnings unless the run is strict *and* the message carries
/// `#rule no_new_facts=true`. Strict mode alone never escalates.
pub fn no_new_facts(message: &Message, ctx: &RuleContext<'_>) -> RuleOutcome {
    let severity = if ctx.no_new_facts_enforced {
        Severity::Error
    } else {
        Severity::Warning
    };
    let mut findings = Vec::new();

    for (i, intent) in message
        .records()
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_intent().map(|intent| (i, intent)))
    {
        let Some(args) = intent.args.as_deref() else {
            continue;
        };
        let mut flag = |text: String| {
            findings.push(Finding::with_severity(severity, RuleCode::NoNewFacts, text).at_record(i));
        };

        if grammar::contains_url(args) {
            flag(format!(
                "Intent '{}' contains URL (move to #ref): {}",
                intent.name, args
            ));
        }
        if grammar::contains_hex_run(args) {
            flag(format!(
                "Intent '{}' contains hex string (move to #ref): {}",
                intent.name, args
            ));
        }
        for (key, value) in grammar::key_values(args) {
            if NUMERIC_ARG_WHITELIST.contains(&key) {
                continue;
            }
            if value.chars().any(|c| c.is_ascii_digit()) {
                flag(format!(
                    "Intent '{}' arg '{}' contains digits (move to #fact): {}",
                    intent.name, key, value
                ));
            }
        }
    }

    RuleOutcome::from_findings(findings)
}

// =============================================================================
// V2: EVIDENCE
// =============================================================================

pub fn evidence(message: &Message, _ctx: &RuleContext<'_>) -> RuleOutcome {
    let mut findings = Vec::new();

    for (i, evid) in directives(message, "evid") {
        let raw = evid.raw.as_str();
        let missing: Vec<&str> = ["claim", "src", "conf"]
            .into_iter()
            .filter(|field| !raw.contains(&format!("{}=", field)))
            .collect();
        if !missing.is_empty() {
            findings.push(
                Finding::error(
                    RuleCode::Evidence,
                    format!("#evid missing required fields: {}", missing.join(", ")),
                )
                .at_record(i),
            );
        }

        if !raw.contains("conf=") {
            continue;
        }
        match grammar::find_confidence(raw).and_then(grammar::parse_decimal) {
            Some(conf) if (0.0..=1.0).contains(&conf) => {}
            Some(conf) => findings.push(
                Finding::error(
                    RuleCode::Evidence,
                    format!("#evid conf out of range [0, 1]: {:?}", conf),
                )
                .at_record(i),
            ),
            None => {
                let literal = grammar::value_of(raw, "conf").unwrap_or(raw);
                findings.push(
                    Finding::error(
                        RuleCode::Evidence,
                        format!("#evid conf is not a number: {}", literal),
                    )
                    .at_record(i),
                );
            }
        }
    }

    RuleOutcome::from_findings(findings)
}

// =============================================================================
// V3: REFS
// =============================================================================

pub fn refs(message: &Message, _ctx: &RuleContext<'_>) -> RuleOutcome {
    let mut findings = Vec::new();

    for (i, record) in directives(message, "ref") {
        let mut candidates = grammar::ref_candidates(&record.raw).peekable();
        if candidates.peek().is_none() {
            findings.push(
                Finding::error(
                    RuleCode::Refs,
                    format!("#ref record has no ref: value: {}", record.raw),
                )
                .at_record(i),
            );
            continue;
        }
        for value in candidates.filter(|v| !is_valid_ref(v)) {
            findings.push(
                Finding::error(RuleCode::Refs, format!("Invalid ref format: {}", value))
                    .at_record(i),
            );
        }
    }

    if let Some(deps) = message.header("deps") {
        for entry in deps.split(',').map(str::trim) {
            if entry.is_empty() {
                findings.push(Finding::error(
                    RuleCode::Refs,
                    format!("Empty entry in @deps: {}", deps),
                ));
            } else if !is_valid_ref(entry) {
                findings.push(Finding::error(
                    RuleCode::Refs,
                    format!("Invalid ref format in @deps: {}", entry),
                ));
            }
        }
    }

    for (key, value) in message.headers() {
        if key == "deps" || !value.starts_with("ref:") {
            continue;
        }
        if !is_valid_ref(value) {
            findings.push(Finding::error(
                RuleCode::Refs,
                format!("Invalid ref format in @{}: {}", key, value),
            ));
        }
    }

    RuleOutcome::from_findings(findings)
}

// =============================================================================
// V6: RID UNIQUENESS
// =============================================================================

/// RIDs are compared in canonical (lowercase) form
pub fn rid_uniqueness(message: &Message, _ctx: &RuleContext<'_>) -> RuleOutcome {
    let mut seen = HashSet::new();
    let mut findings = Vec::new();

    for (i, record) in message.records().iter().enumerate() {
        let Some(rid) = grammar::match_rid(record.raw()) else {
            continue;
        };
        let canonical = rid.to_lowercase();
        if !seen.insert(canonical.clone()) {
            findings.push(
                Finding::error(RuleCode::RidUniqueness, format!("Duplicate RID: {}", canonical))
                    .at_record(i),
            );
        }
    }

    RuleOutcome::from_findings(findings)
}

// =============================================================================
// COST / QUOTA FIELDS
// =============================================================================

const COST_FIELDS: [&str; 2] = ["val", "cur"];
const QUOTA_FIELDS: [&str; 2] = ["type", "total"];

pub fn cost_quota_fields(message: &Message, _ctx: &RuleContext<'_>) -> RuleOutcome {
    let mut findings = Vec::new();

    for (i, record) in message.records().iter().enumerate() {
        let Some(directive) = record.as_directive() else {
            continue;
        };
        let (kind, required): (&str, &[&str]) = if directive.is("cost") {
            ("cost", &COST_FIELDS)
        } else if directive.is("quota") {
            ("quota", &QUOTA_FIELDS)
        } else {
            continue;
        };

        let present: HashSet<&str> = grammar::key_values(&directive.raw).map(|(k, _)| k).collect();
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|field| !present.contains(field))
            .collect();
        if !missing.is_empty() {
            findings.push(
                Finding::error(
                    RuleCode::CostQuota,
                    format!("#{} missing required fields: {}", kind, missing.join(", ")),
                )
                .at_record(i),
            );
        }

        if kind == "cost" {
            if let Some(val) = grammar::value_of(&directive.raw, "val") {
                if grammar::parse_decimal(val).is_none() {
                    findings.push(
                        Finding::error(
                            RuleCode::CostQuota,
                            format!("#cost val is not a non-negative number: {}", val),
                        )
                        .at_record(i),
                    );
                }
            }
        }
    }

    RuleOutcome::from_findings(findings)
}

// =============================================================================
// V8: BUDGET
// =============================================================================

/// A projected overrun is only a warning, but still fails the rule
pub fn budget(_message: &Message, ctx: &RuleContext<'_>) -> RuleOutcome {
    let status = &ctx.budget;
    match status {
        BudgetStatus::NotSpecified | BudgetStatus::Within { .. } => RuleOutcome::pass(),
        BudgetStatus::Invalid { .. } | BudgetStatus::Exceeded { .. } => {
            RuleOutcome::from_findings(vec![Finding::error(RuleCode::Budget, status.to_string())])
        }
        BudgetStatus::ProjectedOverrun { .. } => RuleOutcome {
            passed: false,
            findings: vec![Finding::warning(RuleCode::Budget, status.to_string())],
        },
    }
}
