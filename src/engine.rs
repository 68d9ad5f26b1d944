//! Rule Engine
//!
//! Runs the required-headers gate, then every rule in [`rules::RULES`]
//! regardless of earlier failures, so one pass surfaces every finding. The
//! verdict is "no errors", parse errors included.
//!
//! ```
//! use pairl::{validate_text, ValidationOptions};
//!
//! let report = validate_text(
//!     "@v 1.1\n@mid m1\n@ts 2024-01-01T00:00:00Z\n\nok{}",
//!     &ValidationOptions::default(),
//! );
//! assert!(report.valid);
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ValidationOptions;
use crate::diagnostics::Finding;
use crate::grammar;
use crate::message::{HeadersSummary, Message};
use crate::rules::{self, RuleContext};

// =============================================================================
// BUDGET
// =============================================================================

/// How a message's declared costs compare with its `@budget` header
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    NotSpecified,
    Invalid {
        value: String,
    },
    ProjectedOverrun {
        projected: f64,
        budget: f64,
        currency: String,
    },
    Exceeded {
        total: f64,
        budget: f64,
        currency: String,
    },
    Within {
        total: f64,
        budget: f64,
        currency: String,
    },
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetStatus::NotSpecified => write!(f, "No budget specified"),
            BudgetStatus::Invalid { value } => write!(f, "Invalid budget format: {}", value),
            BudgetStatus::ProjectedOverrun {
                projected,
                budget,
                currency,
            } => write!(
                f,
                "Projected cost {:?} exceeds budget {:?} {}",
                projected, budget, currency
            ),
            BudgetStatus::Exceeded {
                total,
                budget,
                currency,
            } => write!(
                f,
                "Total cost {:?} {} exceeds budget {:?} {}",
                total, currency, budget, currency
            ),
            BudgetStatus::Within {
                total,
                budget,
                currency,
            } => write!(f, "Budget OK: {:?}/{:?} {} used", total, budget, currency),
        }
    }
}

/// Compare `@budget` against the projected cost, then against the sum of
/// same-currency `#cost` records
pub fn budget_status(message: &Message, projected_cost: Option<f64>) -> BudgetStatus {
    let Some(value) = message.header("budget") else {
        return BudgetStatus::NotSpecified;
    };
    let Some((budget, currency)) = grammar::match_budget(value)
        .and_then(|(amount, currency)| Some((grammar::parse_decimal(amount)?, currency)))
    else {
        return BudgetStatus::Invalid {
            value: value.to_string(),
        };
    };

    if let Some(projected) = projected_cost {
        if projected > budget {
            return BudgetStatus::ProjectedOverrun {
                projected,
                budget,
                currency: currency.to_string(),
            };
        }
    }

    let total: f64 = message
        .records()
        .iter()
        .filter_map(|r| r.directive("cost"))
        .filter(|d| grammar::value_of(&d.raw, "cur") == Some(currency))
        .filter_map(|d| grammar::value_of(&d.raw, "val").and_then(grammar::parse_decimal))
        .sum();

    let currency = currency.to_string();
    if total > budget {
        BudgetStatus::Exceeded {
            total,
            budget,
            currency,
        }
    } else {
        BudgetStatus::Within {
            total,
            budget,
            currency,
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

impl Message {
    /// Validate the message, appending findings to its error and warning lists
    ///
    /// Only the first call does any work; later calls return the stored
    /// verdict so the findings of a validated message never change.
    pub fn validate(&mut self, options: &ValidationOptions) -> bool {
        if let Some(verdict) = self.verdict {
            debug!(verdict, "message already validated");
            return verdict;
        }

        let ctx = RuleContext::new(self, options);

        let gate = rules::required_headers(self, &ctx);
        if !gate.passed {
            self.absorb(gate.findings);
            info!(errors = self.errors.len(), "required headers missing, skipping rules");
            self.verdict = Some(false);
            return false;
        }

        let mut findings = Vec::new();
        for (code, rule) in rules::RULES {
            let outcome = rule(self, &ctx);
            debug!(
                rule = %code,
                passed = outcome.passed,
                findings = outcome.findings.len(),
                "rule finished"
            );
            findings.extend(outcome.findings);
        }

        self.absorb(findings);
        self.budget = Some(ctx.budget);

        let verdict = self.errors.is_empty();
        info!(
            verdict,
            strict = options.strict,
            errors = self.errors.len(),
            warnings = self.warnings.len(),
            "validation finished"
        );
        self.verdict = Some(verdict);
        verdict
    }
}

/// Everything a caller needs after one validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub strict: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub summary: HeadersSummary,
    /// Absent when the required-headers gate stopped the run
    pub budget: Option<BudgetStatus>,
}

impl ValidationReport {
    /// Snapshot a message, validating it first if that has not happened yet
    pub fn from_message(message: &mut Message, options: &ValidationOptions) -> Self {
        let valid = message.validate(options);
        Self {
            valid,
            strict: options.strict,
            errors: message.errors().to_vec(),
            warnings: message.warnings().to_vec(),
            summary: message.summary(),
            budget: message.budget_status().cloned(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parse and validate in one step
pub fn validate_text(text: &str, options: &ValidationOptions) -> ValidationReport {
    let mut message = Message::parse(text);
    ValidationReport::from_message(&mut message, options)
}
