//! pairl: parser and rule-validation engine for PAIRL messages
//!
//! A PAIRL message is a header block, a blank line, and a body of records:
//!
//! ```text
//! @v 1.1
//! @mid m1
//! @ts 2024-01-01T00:00:00Z
//! @budget 0.05USD
//!
//! task.summarize{doc=report} @rid=a1
//! #evid claim=a1 src=ref:kb:doc:report conf=0.8
//! #cost val=0.01 cur=USD
//! ```
//!
//! This crate contains:
//! - Lexical grammars for intent records, RIDs, key=value tokens, confidence
//!   and budget literals
//! - The message parser (headers + classified records)
//! - The ref validator
//! - The rule engine and its report types
//!
//! Reading files, argument parsing and console output live in the `pairl`
//! binary (feature `cli`).

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod message;
pub mod refs;
pub mod rules;

// Re-export commonly used types
pub use config::{load_options, OptionsLayer, ValidationOptions};
pub use diagnostics::{Finding, RuleCode, Severity};
pub use engine::{budget_status, validate_text, BudgetStatus, ValidationReport};
pub use error::{PairlError, Result};
pub use message::{read_message, Directive, HeadersSummary, Intent, Message, Record};
pub use refs::{is_valid_ref, parse_ref, RefParts};
