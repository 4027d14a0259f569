//! Human-readable output for flow results and saved report files.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;

use evalflow_core::{FlowOutcome, FlowRequest, FlowResult, RetryPolicy};
use evalflow_provider::ProviderKind;
use evalflow_report::EvaluationReport;

pub fn print_report(title: &str, report: &EvaluationReport) {
    println!();
    println!("{}", format!("=== {} ===", title).bold());
    println!("{}", report);
}

/// Print every stage a flow produced, in stage order
pub fn print_flow_result(result: &FlowResult) {
    if let Some(report) = result.prompt_report() {
        print_report("Prompt Evaluation Results", &report);
    }

    if let Some(ref text) = result.generated_text {
        println!();
        println!("{}", "=== Generated Content ===".bold());
        println!("{}", text);
    }

    if let Some(report) = result.response_report() {
        print_report("Response Evaluation Results", &report);
    }

    if result.failed_metrics {
        println!();
        println!("{}", "At least one metric has a FAILED status".yellow());
    }
}

pub fn print_outcome(outcome: &FlowOutcome) {
    print_flow_result(outcome.result());

    match outcome {
        FlowOutcome::Completed { duration_secs, .. } => {
            eprintln!();
            eprintln!("{}", "=== COMPLETED ===".green().bold());
            eprintln!("Duration: {:.1}s", duration_secs);
        }
        FlowOutcome::Failed {
            stage,
            error,
            duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== FAILED ===".red().bold());
            eprintln!("Stage: {}", stage);
            eprintln!("Error: {}", error);
            eprintln!("Duration: {:.1}s", duration_secs);
        }
    }
}

pub fn print_dry_run(request: &FlowRequest, kind: ProviderKind, retry: &RetryPolicy) {
    println!("=== Dry Run ===");
    println!("Prompt: {}", request.prompt_preview());
    println!("Context: {} chars", request.context.chars().count());
    println!("Generator: {}", kind);
    println!("Prompt metrics: {}", request.prompt_metrics.join(", "));
    println!("Response metrics: {}", request.response_metrics.join(", "));
    println!(
        "Attempts per stage: {} (base delay {:.1}s)",
        retry.max_retries(),
        retry.base_delay().as_secs_f64()
    );
}

/// What a saved file turned out to contain
#[derive(Debug)]
pub enum SavedFile {
    /// A raw evaluation response
    Report(EvaluationReport),
    /// Flow results, one per JSONL line
    Results(Vec<FlowResult>),
}

pub fn print_report_file(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match parse_saved(&content).with_context(|| format!("Failed to parse {}", path.display()))? {
        SavedFile::Report(report) => print_report("Evaluation Results", &report),
        SavedFile::Results(results) => {
            for result in &results {
                print_flow_result(result);
            }
        }
    }
    Ok(())
}

/// Accepts a raw evaluation response, a single flow result, the outcome
/// printed by `run --json-output`, or a JSONL result file whose lines are
/// `{"timestamp": ..., "data": <result>}`.
pub fn parse_saved(content: &str) -> Result<SavedFile> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return match as_flow_result(&value)? {
            Some(result) => Ok(SavedFile::Results(vec![result])),
            None => Ok(SavedFile::Report(EvaluationReport::from_value(&value))),
        };
    }

    let mut results = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Line {} is not valid JSON", idx + 1))?;
        let result = as_flow_result(&value)?
            .with_context(|| format!("Line {} is not a flow result", idx + 1))?;
        results.push(result);
    }

    if results.is_empty() {
        anyhow::bail!("File is empty");
    }
    Ok(SavedFile::Results(results))
}

fn as_flow_result(value: &Value) -> Result<Option<FlowResult>> {
    let Some(obj) = value.as_object() else {
        return Ok(None);
    };

    // Result file line, `run --json-output` outcome, or a bare result
    let data = match obj
        .get("data")
        .or_else(|| obj.get("result"))
        .or_else(|| obj.get("partial"))
    {
        Some(data) => data,
        None if obj.contains_key("prompt_evaluation") => value,
        None => return Ok(None),
    };

    let result = serde_json::from_value(data.clone()).context("Invalid flow result")?;
    Ok(Some(result))
}
