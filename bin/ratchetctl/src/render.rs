//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "binary"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Human and JSON rendering of run reports and status."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fmt::Write as _;

use anyhow::Result;
use ratchet_core::ScriptDescriptor;
use ratchet_engine::{RunReport, ScriptResult};
use serde::Serialize;

/// Snapshot printed by `ratchetctl status`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub target: String,
    pub journal: String,
    pub upgrade_required: bool,
    pub executed: Vec<String>,
    pub pending: Vec<ScriptDescriptor>,
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn report_table(report: &RunReport) -> String {
    let width = name_width(report.results.iter().map(|r| r.name.as_str()));
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>6}  {:<10}  {:<8}  DETAIL",
        "SCRIPT", "ORDER", "TYPE", "OUTCOME"
    );
    for result in &report.results {
        let _ = writeln!(
            out,
            "{:<width$}  {:>6}  {:<10}  {:<8}  {}",
            result.name,
            result.run_order,
            result.script_type.as_str(),
            result.outcome.as_str(),
            detail(result)
        );
    }
    for error in &report.run_errors {
        let _ = writeln!(out, "run error: {error}");
    }
    let _ = writeln!(out, "{report}");
    out
}

pub fn status_text(view: &StatusView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Target: {}", view.target);
    let _ = writeln!(out, "Journal: {} ({} entries)", view.journal, view.executed.len());
    let _ = writeln!(out, "Upgrade required: {}", view.upgrade_required);
    if !view.pending.is_empty() {
        let width = name_width(view.pending.iter().map(|d| d.name.as_str()));
        let _ = writeln!(out, "Pending:");
        for descriptor in &view.pending {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>6}  {}",
                descriptor.name,
                descriptor.run_order,
                descriptor.script_type.as_str()
            );
        }
    }
    out
}

fn detail(result: &ScriptResult) -> String {
    if let Some(failure) = &result.failure {
        return failure.to_string();
    }
    if let Some(reason) = result.skip_reason {
        return reason.as_str().to_owned();
    }
    result
        .duration
        .map(|d| format!("{} ms", d.as_millis()))
        .unwrap_or_default()
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0).max("SCRIPT".len())
}
