//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::cloud::{Image, Subnet};
use crate::config::{Manifest, ValidationResult};
use crate::error::ConvergeError;
use crate::reconciler::{AppliedResource, ApplyReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Applied resource row for table display.
#[derive(Tabled)]
struct AppliedRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Subnet row for table display.
#[derive(Tabled)]
struct SubnetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the report of an apply run.
    #[must_use]
    pub fn format_apply(&self, report: &ApplyReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(&ApplyJson::from(report)),
            OutputFormat::Text => Self::format_apply_text(report),
        }
    }

    fn format_apply_text(report: &ApplyReport) -> String {
        let mut output = String::new();

        if report.applied.is_empty() && report.is_success() {
            return format!("{} Nothing to converge.\n", "✓".green());
        }

        if !report.applied.is_empty() {
            let rows: Vec<AppliedRow> = report.applied.iter().map(AppliedRow::from).collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        for entry in &report.applied {
            if let Some(diff) = &entry.outcome.diff {
                let _ = write!(output, "\n{} {} '{}':\n", "~".yellow(), entry.kind, entry.name);
                for line in diff.lines() {
                    let colored = if line.starts_with("- ") {
                        line.red().to_string()
                    } else if line.starts_with("+ ") {
                        line.green().to_string()
                    } else {
                        line.dimmed().to_string()
                    };
                    let _ = writeln!(output, "   {colored}");
                }
            }
        }

        let changed = report.changed_count();
        let _ = write!(
            output,
            "\nConverged: {} changed, {} unchanged\n",
            changed.to_string().yellow(),
            (report.applied.len() - changed).to_string().green()
        );

        if let Some(failure) = &report.failure {
            let _ = writeln!(output, "\n{} {failure}", "✗".red());
        }

        output
    }

    /// Formats a validation summary.
    #[must_use]
    pub fn format_validation(
        &self,
        manifest: &Manifest,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "disks": manifest.disks.len(),
                "instances": manifest.instances.len(),
                "deletions": manifest.has_deletions(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Manifest is valid: {} disks, {} instances\n",
                    "✓".green(),
                    manifest.disks.len(),
                    manifest.instances.len()
                );

                if manifest.has_deletions() {
                    let _ = writeln!(output, "   {} some resources target deletion", "!".yellow());
                }

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats an image lookup.
    #[must_use]
    pub fn format_image(&self, image: &Image) -> String {
        match self.format {
            OutputFormat::Json => to_json(image),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "{} {}", "Image:".bold(), image.id);
                let _ = writeln!(output, "   Name: {}", image.name);
                let _ = writeln!(output, "   Family: {}", image.family);
                let _ = writeln!(output, "   Min disk size: {} bytes", image.min_disk_size);
                if let Some(created_at) = image.created_at {
                    let _ = writeln!(output, "   Created: {}", created_at.format("%Y-%m-%d %H:%M"));
                }
                output
            }
        }
    }

    /// Formats a subnet listing.
    #[must_use]
    pub fn format_subnets(&self, subnets: &[Subnet]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "subnets": subnets })),
            OutputFormat::Text => {
                if subnets.is_empty() {
                    return String::from("   No subnets found.\n");
                }
                let rows: Vec<SubnetRow> = subnets
                    .iter()
                    .map(|s| SubnetRow {
                        id: s.id.clone(),
                        name: s.name.clone(),
                        zone: s.zone_id.clone(),
                        cidr: s.v4_cidr_blocks.join(", "),
                    })
                    .collect();
                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a fatal error.
    #[must_use]
    pub fn format_error(&self, error: &ConvergeError) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "msg": error.to_string() })),
            OutputFormat::Text => format!("{} {error}\n", "✗".red()),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_default();
    json.push('\n');
    json
}

impl From<&AppliedResource> for AppliedRow {
    fn from(entry: &AppliedResource) -> Self {
        let result = if entry.outcome.changed {
            entry.outcome.message.yellow().to_string()
        } else {
            entry.outcome.message.green().to_string()
        };
        let id = entry
            .outcome
            .resource
            .as_ref()
            .and_then(|r| r.get("id"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-");

        Self {
            kind: entry.kind.to_string(),
            name: OutputFormatter::truncate(&entry.name, 32),
            result,
            id: id.to_string(),
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct ApplyJson<'a> {
    changed: bool,
    results: &'a [AppliedResource],
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
}

impl<'a> From<&'a ApplyReport> for ApplyJson<'a> {
    fn from(report: &'a ApplyReport) -> Self {
        Self {
            changed: report.changed_count() > 0,
            results: &report.applied,
            msg: report.failure.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::ReconcileOutcome;

    fn report() -> ApplyReport {
        ApplyReport {
            applied: vec![AppliedResource {
                kind: "disk",
                name: String::from("data-1"),
                outcome: ReconcileOutcome::changed(
                    String::from("disk 'data-1' updated"),
                    Some(serde_json::json!({"id": "d1"})),
                )
                .with_diff(Some(String::from("- a\n+ b\n"))),
            }],
            failure: None,
        }
    }

    #[test]
    fn test_apply_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_apply(&report());
        let json: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(json["changed"], true);
        assert_eq!(json["results"][0]["msg"], "disk 'data-1' updated");
        assert_eq!(json["results"][0]["diff"], "- a\n+ b\n");
        assert!(json.get("msg").is_none());
    }

    #[test]
    fn test_apply_text_lists_resources() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_apply(&report());
        assert!(output.contains("data-1"));
        assert!(output.contains("d1"));
        assert!(output.contains("1 changed, 0 unchanged"));
    }

    #[test]
    fn test_error_json_shape() {
        let err = ConvergeError::internal("boom");
        let output = OutputFormatter::new(OutputFormat::Json).format_error(&err);
        let json: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(json, serde_json::json!({"msg": "Internal error: boom"}));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a-very-long-name", 8), "a-ver...");
    }
}
