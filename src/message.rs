//! Message Parser
//!
//! Splits raw PAIRL text into a header block and a body block:
//!
//! ```text
//! @v 1.1
//! @mid m1
//! @ts 2024-01-01T00:00:00Z
//!
//! task.plan{dest=paris} @rid=a1
//! #evid claim=x src=y conf=0.9
//! ```
//!
//! Parsing never fails. Structural problems are recorded as findings on the
//! message and the rest of the text is still parsed.

use std::collections::BTreeMap;
use std::path::Path;

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace1},
    combinator::rest,
    IResult,
};
use serde::Serialize;

use crate::diagnostics::{Finding, RuleCode};
use crate::engine::BudgetStatus;
use crate::error::{PairlError, Result};
use crate::grammar;

// ============================================================================
// Records
// ============================================================================

/// A `#`-prefixed body line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Text between `#` and the first whitespace (`evid`, `ref`, `cost`, ...)
    pub kind: String,
    pub raw: String,
}

impl Directive {
    /// Whether the record text starts with `#<kind>`, so `#refs` and
    /// `#reference` are both `ref` directives
    pub fn is(&self, kind: &str) -> bool {
        self.raw
            .strip_prefix('#')
            .is_some_and(|rest| rest.starts_with(kind))
    }
}

/// A body line that matched the intent grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub name: String,
    pub args: Option<String>,
    pub rid: Option<String>,
    pub raw: String,
}

/// One trimmed, non-empty body line, classified once at parse time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Directive(Directive),
    Intent(Intent),
    /// Not a directive, and rejected by the intent grammar
    Malformed(String),
}

impl Record {
    pub fn classify(line: &str) -> Self {
        if let Some(body) = line.strip_prefix('#') {
            let kind = body.split_whitespace().next().unwrap_or("");
            return Record::Directive(Directive {
                kind: kind.to_string(),
                raw: line.to_string(),
            });
        }

        match grammar::match_intent(line) {
            Some(m) => Record::Intent(Intent {
                name: m.name.to_string(),
                args: m.args.map(str::to_string),
                rid: m.rid.map(str::to_string),
                raw: line.to_string(),
            }),
            None => Record::Malformed(line.to_string()),
        }
    }

    /// The record text exactly as it appeared (trimmed)
    pub fn raw(&self) -> &str {
        match self {
            Record::Directive(d) => &d.raw,
            Record::Intent(i) => &i.raw,
            Record::Malformed(raw) => raw,
        }
    }

    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            Record::Directive(d) => Some(d),
            _ => None,
        }
    }

    /// The directive, if this record is a directive of the given kind
    pub fn directive(&self, kind: &str) -> Option<&Directive> {
        self.as_directive().filter(|d| d.is(kind))
    }

    pub fn as_intent(&self) -> Option<&Intent> {
        match self {
            Record::Intent(i) => Some(i),
            _ => None,
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A parsed PAIRL message plus the findings accumulated against it
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) records: Vec<Record>,
    pub(crate) errors: Vec<Finding>,
    pub(crate) warnings: Vec<Finding>,
    pub(crate) verdict: Option<bool>,
    pub(crate) budget: Option<BudgetStatus>,
}

/// Header values the CLI reports after validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadersSummary {
    pub version: Option<String>,
    pub message_id: Option<String>,
    pub timestamp: Option<String>,
    pub record_count: usize,
    pub budget: Option<String>,
}

impl Message {
    /// Parse raw text into a message
    pub fn parse(text: &str) -> Self {
        let mut message = Self {
            headers: BTreeMap::new(),
            records: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            verdict: None,
            budget: None,
        };

        let normalized = text.replace("\r\n", "\n");
        let Some((header_block, body_block)) = normalized.trim().split_once("\n\n") else {
            message.errors.push(Finding::error(
                RuleCode::Structure,
                "Message must have header block and body block separated by a blank line",
            ));
            return message;
        };

        message.parse_headers(header_block);
        message.records = body_block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Record::classify)
            .collect();

        tracing::debug!(
            headers = message.headers.len(),
            records = message.records.len(),
            parse_errors = message.errors.len(),
            "parsed PAIRL message"
        );

        message
    }

    fn parse_headers(&mut self, block: &str) {
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !line.starts_with('@') {
                self.errors.push(Finding::error(
                    RuleCode::HeaderSyntax,
                    format!("Invalid header line (must start with @): {}", line),
                ));
                continue;
            }

            match header_line(line) {
                Ok((_, (key, value))) if !value.trim().is_empty() => {
                    // Last write wins
                    self.headers.insert(key.to_string(), value.trim().to_string());
                }
                _ => self.errors.push(Finding::error(
                    RuleCode::HeaderSyntax,
                    format!("Malformed header: {}", line),
                )),
            }
        }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Errors in the order they were found (parse errors first)
    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    /// Verdict of the validation run, once one has happened
    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }

    pub fn is_validated(&self) -> bool {
        self.verdict.is_some()
    }

    /// Budget outcome of the validation run, if the budget rule ran
    pub fn budget_status(&self) -> Option<&BudgetStatus> {
        self.budget.as_ref()
    }

    pub fn summary(&self) -> HeadersSummary {
        HeadersSummary {
            version: self.header("v").map(str::to_string),
            message_id: self.header("mid").map(str::to_string),
            timestamp: self.header("ts").map(str::to_string),
            record_count: self.records.len(),
            budget: self.header("budget").map(str::to_string),
        }
    }

    /// Split findings into the error and warning sequences, keeping order
    pub(crate) fn absorb(&mut self, findings: Vec<Finding>) {
        for finding in findings {
            if finding.is_error() {
                self.errors.push(finding);
            } else {
                self.warnings.push(finding);
            }
        }
    }
}

/// Read and parse a message file
pub fn read_message(path: impl AsRef<Path>) -> Result<Message> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PairlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Message::parse(&text))
}

// ============================================================================
// Header line parser
// ============================================================================

/// `@<word-key> <whitespace> <value>`
fn header_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = char('@')(input)?;
    let (input, key) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    let (input, _) = multispace1(input)?;
    let (input, value) = rest(input)?;
    Ok((input, (key, value)))
}
