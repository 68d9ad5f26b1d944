//! Diagnostic types for validation results
//!
//! Every parse problem and rule violation becomes a [`Finding`]. Findings are
//! data, never control flow: rules collect them and the engine merges them
//! into the message in a fixed order.

use serde::{Deserialize, Serialize};

/// Severity level for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Policy heuristic in its non-enforced state (does not fail validation)
    Warning,
    /// Mandatory rule violation (fails validation)
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Which check produced a finding
///
/// Serialized as its short code, the same text [`RuleCode::as_str`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCode {
    // =========================================================================
    // Parse
    // =========================================================================
    /// Header/body separator missing
    #[serde(rename = "P001")]
    Structure,
    /// Header line without `@` or not of the form `@key value`
    #[serde(rename = "P002")]
    HeaderSyntax,

    // =========================================================================
    // Rules
    // =========================================================================
    #[serde(rename = "V0")]
    RequiredHeaders,
    #[serde(rename = "I001")]
    IntentSyntax,
    #[serde(rename = "V1")]
    NoNewFacts,
    #[serde(rename = "V2")]
    Evidence,
    #[serde(rename = "V3")]
    Refs,
    #[serde(rename = "V6")]
    RidUniqueness,
    #[serde(rename = "C001")]
    CostQuota,
    #[serde(rename = "V8")]
    Budget,
}

impl RuleCode {
    /// Stable short code used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::Structure => "P001",
            RuleCode::HeaderSyntax => "P002",
            RuleCode::RequiredHeaders => "V0",
            RuleCode::IntentSyntax => "I001",
            RuleCode::NoNewFacts => "V1",
            RuleCode::Evidence => "V2",
            RuleCode::Refs => "V3",
            RuleCode::RidUniqueness => "V6",
            RuleCode::CostQuota => "C001",
            RuleCode::Budget => "V8",
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: RuleCode,
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Zero-based body record index, when the finding is tied to one record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<usize>,
}

impl Finding {
    /// Create an error finding
    pub fn error(code: RuleCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            record: None,
        }
    }

    /// Create a warning finding
    pub fn warning(code: RuleCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            record: None,
        }
    }

    /// Create a finding whose severity is decided by the caller
    pub fn with_severity(severity: Severity, code: RuleCode, message: impl Into<String>) -> Self {
        match severity {
            Severity::Error => Self::error(code, message),
            Severity::Warning => Self::warning(code, message),
        }
    }

    /// Attach the body record index
    pub fn at_record(mut self, index: usize) -> Self {
        self.record = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
