//! PAIRL Command Line Validator
//!
//! Parses and validates a single PAIRL message file, prints every finding and
//! then a pass/fail verdict.
//!
//! # Usage
//!
//! ```bash
//! # Loose validation
//! pairl message.pairl
//!
//! # Strict validation with an externally projected cost
//! pairl --strict --projected-cost 0.04 message.pairl
//!
//! # Machine-readable report
//! pairl --format json message.pairl
//! ```
//!
//! Exit status: 0 valid, 1 validation errors, 2 input or config could not be read.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use pairl::{load_options, read_message, Finding, ValidationOptions, ValidationReport};

#[derive(Parser)]
#[command(name = "pairl")]
#[command(version)]
#[command(about = "Validate PAIRL messages against the grammar and policy rules")]
#[command(long_about = None)]
struct Cli {
    /// Message file to validate
    file: PathBuf,

    /// Escalate no-new-facts findings for messages that declare `#rule no_new_facts=true`
    #[arg(long)]
    strict: bool,

    /// Projected cost checked against the `@budget` header
    #[arg(long, value_name = "AMOUNT")]
    projected_cost: Option<f64>,

    /// YAML file with validation options
    #[arg(long, short, env = "PAIRL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

const INPUT_FAILURE: u8 = 2;

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let options = match resolve_options(&cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            return ExitCode::from(INPUT_FAILURE);
        }
    };

    let mut message = match read_message(&cli.file) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ExitCode::from(INPUT_FAILURE);
        }
    };

    // Findings present before validation are parse findings
    let parse_error_count = message.errors().len();
    let report = ValidationReport::from_message(&mut message, &options);

    let printed = match cli.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Pretty => {
            print_pretty(&cli.file, parse_error_count, &report);
            Ok(())
        }
    };
    if let Err(e) = printed {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        return ExitCode::FAILURE;
    }

    if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Environment, then config file, then flags
fn resolve_options(cli: &Cli) -> Result<ValidationOptions> {
    let mut options =
        ValidationOptions::from_env().context("invalid PAIRL_* environment variable")?;

    if let Some(path) = &cli.config {
        let file_options = load_options(path)?;
        options = options.merged_with(&file_options);
    }

    if cli.strict {
        options.strict = true;
    }
    if let Some(cost) = cli.projected_cost {
        options.projected_cost = Some(cost);
    }

    Ok(options)
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_json(report: &ValidationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    println!("{}", json);
    Ok(())
}

fn print_pretty(path: &Path, parse_error_count: usize, report: &ValidationReport) {
    println!("Validating: {}", path.display());
    println!("Mode: {}", if report.strict { "strict" } else { "loose" });
    println!("{}", "-".repeat(50));

    let (parse_errors, rule_errors) = report.errors.split_at(parse_error_count);
    print_section(&"Parse errors".red().bold().to_string(), parse_errors);
    print_section(&"Validation errors".red().bold().to_string(), rule_errors);
    print_section(&"Warnings".yellow().bold().to_string(), &report.warnings);

    if report.valid {
        println!("\n{} Validation PASSED", "✓".green().bold());
    } else {
        println!("\n{} Validation FAILED", "✗".red().bold());
    }

    let summary = &report.summary;
    println!("\nMessage info:");
    println!("  Version: {}", summary.version.as_deref().unwrap_or("N/A"));
    println!("  ID: {}", summary.message_id.as_deref().unwrap_or("N/A"));
    println!("  Timestamp: {}", summary.timestamp.as_deref().unwrap_or("N/A"));
    println!("  Records: {}", summary.record_count);
    if let Some(budget) = &summary.budget {
        println!("  Budget: {}", budget);
        if let Some(status) = &report.budget {
            println!("  Budget status: {}", status);
        }
    }
}

fn print_section(title: &str, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, findings.len());
    for finding in findings {
        println!("  - [{}] {}", finding.code, finding);
    }
}
