//! End-to-end validation scenarios
//!
//! Runs whole messages through parse + validate and checks the collected
//! errors, warnings and verdict. Also sweeps the fixture corpus in
//! `tests/fixtures/`: files named `valid_*` must pass in both modes and
//! files named `invalid_*` must fail in both modes.

use std::path::PathBuf;

use pairl::{
    read_message, validate_text, BudgetStatus, Message, RuleCode, ValidationOptions,
    ValidationReport,
};
use pretty_assertions::assert_eq;

const HEADERS: &str = "@v 1.1\n@mid m1\n@ts 2024-01-01T00:00:00Z";

fn with_body(body: &str) -> String {
    format!("{}\n\n{}", HEADERS, body)
}

fn error_messages(report: &ValidationReport) -> Vec<&str> {
    report.errors.iter().map(|f| f.message.as_str()).collect()
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn minimal_message_is_valid() {
    let report = validate_text(&with_body("ok{}"), &ValidationOptions::default());
    assert!(report.valid);
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(report.summary.record_count, 1);
    assert_eq!(report.budget, Some(BudgetStatus::NotSpecified));
}

#[test]
fn ref_with_embedded_space_is_one_error() {
    let report = validate_text(
        &with_body("#ref target=ref:bad value"),
        &ValidationOptions::default(),
    );
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, RuleCode::Refs);
}

#[test]
fn evidence_confidence_out_of_range_is_one_error() {
    let report = validate_text(
        &with_body("#evid claim=x src=y conf=1.5"),
        &ValidationOptions::default(),
    );
    assert_eq!(error_messages(&report), vec!["#evid conf out of range [0, 1]: 1.5"]);
}

#[test]
fn summed_costs_over_budget() {
    let text = format!(
        "{}\n@budget 10.00USD\n\n#cost val=4 cur=USD\n#cost val=7 cur=USD",
        HEADERS
    );
    let report = validate_text(&text, &ValidationOptions::default());
    assert!(!report.valid);
    assert_eq!(
        error_messages(&report),
        vec!["Total cost 11.0 USD exceeds budget 10.0 USD"]
    );
    assert!(matches!(
        report.budget,
        Some(BudgetStatus::Exceeded { total, .. }) if total == 11.0
    ));
}

#[test]
fn prefixed_directives_are_checked() {
    for (body, code) in [
        ("#refs a=ref:bad", RuleCode::Refs),
        ("#reference a=ref:bad", RuleCode::Refs),
        ("#evidence claim=x src=y conf=7", RuleCode::Evidence),
    ] {
        let report = validate_text(&with_body(body), &ValidationOptions::default());
        assert!(!report.valid, "{} should fail", body);
        assert_eq!(report.errors.len(), 1, "{}: {:?}", body, report.errors);
        assert_eq!(report.errors[0].code, code);
    }
}

#[test]
fn rid_duplicates_differing_in_case() {
    let report = validate_text(
        &with_body("ok{} @rid=AB\nack{} @rid=ab"),
        &ValidationOptions::default(),
    );
    assert_eq!(error_messages(&report), vec!["Duplicate RID: ab"]);
}

#[test]
fn missing_required_header_stops_at_gate() {
    let report = validate_text(
        "@v 1.1\n@ts now\n\nBAD{}\n#evid\n#ref x=ref:bad",
        &ValidationOptions::default(),
    );
    assert!(!report.valid);
    assert_eq!(error_messages(&report), vec!["Missing required header: @mid"]);
    assert_eq!(report.budget, None);
}

#[test]
fn unknown_directive_is_ignored() {
    let report = validate_text(
        &with_body("#mood cheerful=yes 42\n#note @rid=n1"),
        &ValidationOptions::default(),
    );
    assert!(report.valid);
    assert!(report.warnings.is_empty());
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn validation_is_idempotent_across_fresh_messages() {
    let text = with_body(
        "task.go{when=2024,url=http://x.io}\nBad\n#evid claim=x conf=2\nok{} @rid=a\nno{} @rid=A",
    );
    for options in [ValidationOptions::default(), ValidationOptions::strict()] {
        let first = validate_text(&text, &options);
        let second = validate_text(&text, &options);
        assert_eq!(first.valid, second.valid);
        assert_eq!(first.errors, second.errors);
        assert_eq!(first.warnings, second.warnings);
    }
}

#[test]
fn strict_and_loose_agree_without_opt_in() {
    let text = with_body("task.go{when=2024,src=https://x.io,id=0123456789abcdef}");
    let loose = validate_text(&text, &ValidationOptions::default());
    let strict = validate_text(&text, &ValidationOptions::strict());

    let facts = |r: &ValidationReport| -> Vec<String> {
        r.errors
            .iter()
            .chain(&r.warnings)
            .filter(|f| f.code == RuleCode::NoNewFacts)
            .map(|f| f.message.clone())
            .collect()
    };
    assert_eq!(facts(&loose), facts(&strict));
    assert_eq!(facts(&loose).len(), 4);
    assert!(strict.valid);
}

#[test]
fn strict_escalates_only_with_rule_directive() {
    let text = with_body("#rule no_new_facts=true\ntask.go{when=2024}");

    let loose = validate_text(&text, &ValidationOptions::default());
    assert!(loose.valid);
    assert_eq!(loose.warnings.len(), 1);

    let strict = validate_text(&text, &ValidationOptions::strict());
    assert!(!strict.valid);
    assert_eq!(strict.errors.len(), 1);
    assert_eq!(strict.errors[0].code, RuleCode::NoNewFacts);
    assert!(strict.warnings.is_empty());
}

#[test]
fn message_is_frozen_after_validation() {
    let mut message = Message::parse(&with_body("Bad{}"));
    assert!(!message.validate(&ValidationOptions::default()));
    let errors = message.errors().to_vec();
    assert!(!message.validate(&ValidationOptions::strict()));
    assert_eq!(message.errors(), errors.as_slice());
}

// =============================================================================
// Fixture corpus
// =============================================================================

#[test]
fn fixture_corpus_verdicts() {
    let mut seen = 0;
    for entry in std::fs::read_dir(fixtures_dir()).expect("read fixtures dir") {
        let path = entry.expect("fixture entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("pairl") {
            continue;
        }
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap().to_string();
        let expect_valid = name.starts_with("valid_");
        assert!(
            expect_valid || name.starts_with("invalid_"),
            "fixture {} must be named valid_* or invalid_*",
            name
        );

        for options in [ValidationOptions::default(), ValidationOptions::strict()] {
            let mut message = read_message(&path).expect("read fixture");
            let report = ValidationReport::from_message(&mut message, &options);
            assert_eq!(
                report.valid, expect_valid,
                "fixture {} (strict={}) errors: {:?}",
                name, options.strict, report.errors
            );
        }
        seen += 1;
    }
    assert!(seen >= 6, "expected at least 6 fixtures, found {}", seen);
}

#[test]
fn full_fixture_reports_budget_within() {
    let mut message = read_message(fixtures_dir().join("valid_full.pairl")).unwrap();
    let report = ValidationReport::from_message(&mut message, &ValidationOptions::strict());
    assert!(report.valid);
    assert_eq!(report.summary.message_id.as_deref(), Some("msg-0042"));
    assert_eq!(report.summary.record_count, 10);
    match report.budget {
        Some(BudgetStatus::Within {
            total,
            budget,
            ref currency,
        }) => {
            assert!((total - 0.03).abs() < 1e-9);
            assert_eq!(budget, 0.05);
            assert_eq!(currency, "USD");
        }
        other => panic!("unexpected budget status: {:?}", other),
    }
}
