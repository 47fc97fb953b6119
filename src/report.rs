//! Batch conversion report.
//!
//! One [`ConversionRecord`] per input document, successes and failures alike.
//! A failed document only contributes to the failure count.

use std::{fmt::Write as _, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{io_utils, rename::RenameOutcome};

pub const MARKDOWN_REPORT: &str = "conversion_report.md";
pub const JSON_REPORT: &str = "conversion_report.json";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConversionRecord {
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_table_name: Option<String>,
    pub columns_renamed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionRecord {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn table_renamed(&self) -> bool {
        match (&self.original_table_name, &self.new_table_name) {
            (Some(original), Some(new)) => original != new,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub generated_at: String,
    pub total_files: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub tables_renamed: usize,
    pub columns_renamed: usize,
    pub records: Vec<ConversionRecord>,
}

impl ConversionReport {
    pub fn successes(&self) -> impl Iterator<Item = &ConversionRecord> {
        self.records.iter().filter(|r| !r.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionRecord> {
        self.records.iter().filter(|r| r.is_failure())
    }
}

#[derive(Debug, Default)]
pub struct ReportBuilder {
    records: Vec<ConversionRecord>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, source_file: &str, outcome: &RenameOutcome, output_file: &str) {
        self.records.push(ConversionRecord {
            source_file: source_file.to_string(),
            original_table_name: Some(outcome.original_table_name.clone()),
            new_table_name: Some(outcome.new_table_name.clone()),
            columns_renamed: outcome.columns_renamed,
            output_file: Some(output_file.to_string()),
            error: None,
        });
    }

    pub fn record_failure(&mut self, source_file: &str, error: &anyhow::Error) {
        self.records.push(ConversionRecord {
            source_file: source_file.to_string(),
            original_table_name: None,
            new_table_name: None,
            columns_renamed: 0,
            output_file: None,
            error: Some(format!("{error:#}")),
        });
    }

    pub fn finish(self, generated_at: DateTime<Local>) -> ConversionReport {
        let failed_count = self.records.iter().filter(|r| r.is_failure()).count();
        let successes = self.records.iter().filter(|r| !r.is_failure());
        let (tables_renamed, columns_renamed) =
            successes.fold((0usize, 0usize), |(tables, columns), record| {
                (
                    tables + usize::from(record.table_renamed()),
                    columns + record.columns_renamed,
                )
            });
        ConversionReport {
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_files: self.records.len(),
            success_count: self.records.len() - failed_count,
            failed_count,
            tables_renamed,
            columns_renamed,
            records: self.records,
        }
    }
}

pub fn render_markdown(report: &ConversionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Schema conversion report\n");
    let _ = writeln!(out, "Generated: {}\n", report.generated_at);
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "- Files processed: {}", report.total_files);
    let _ = writeln!(out, "- Succeeded: {}", report.success_count);
    let _ = writeln!(out, "- Failed: {}", report.failed_count);
    let _ = writeln!(out, "- Tables renamed: {}", report.tables_renamed);
    let _ = writeln!(out, "- Columns renamed: {}\n", report.columns_renamed);

    let mut successes = report.successes().peekable();
    if successes.peek().is_some() {
        let _ = writeln!(out, "## Conversions\n");
        for record in successes {
            let _ = writeln!(out, "### {}", record.source_file);
            let _ = writeln!(
                out,
                "- Original table: `{}`",
                record.original_table_name.as_deref().unwrap_or_default()
            );
            let _ = writeln!(
                out,
                "- New table: `{}`",
                record.new_table_name.as_deref().unwrap_or_default()
            );
            if record.columns_renamed == 0 {
                let _ = writeln!(out, "- Columns renamed: 0 (no changes)");
            } else {
                let _ = writeln!(out, "- Columns renamed: {}", record.columns_renamed);
            }
            let _ = writeln!(
                out,
                "- Output file: `{}`\n",
                record.output_file.as_deref().unwrap_or_default()
            );
        }
    }

    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        let _ = writeln!(out, "## Errors\n");
        for record in failures {
            let _ = writeln!(
                out,
                "- {}: {}",
                record.source_file,
                record.error.as_deref().unwrap_or_default()
            );
        }
    }
    out
}

/// Aligned plain-text table of per-document results for the terminal.
pub fn render_summary(report: &ConversionReport) -> String {
    let headers = ["source", "table", "columns", "output"].map(String::from);
    let rows = report
        .records
        .iter()
        .map(|record| {
            let table = match (&record.original_table_name, &record.new_table_name) {
                (Some(original), Some(new)) if original != new => format!("{original} -> {new}"),
                (_, Some(new)) => new.clone(),
                _ => String::new(),
            };
            let output = match &record.error {
                Some(error) => format!("FAILED: {}", error.replace(['\n', '\r', '\t'], " ")),
                None => record.output_file.clone().unwrap_or_default(),
            };
            [
                record.source_file.clone(),
                table,
                record.columns_renamed.to_string(),
                output,
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = headers.each_ref().map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let mut push_row = |cells: &[String; 4]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(output, "{}", line.trim_end());
    };
    push_row(&headers);
    push_row(&widths.map(|w| "-".repeat(w.max(3))));
    for row in &rows {
        push_row(row);
    }
    let _ = writeln!(
        output,
        "{} succeeded, {} failed, {} table(s) renamed, {} column(s) renamed",
        report.success_count, report.failed_count, report.tables_renamed, report.columns_renamed
    );
    output
}

/// Writes the markdown and JSON renderings into `output_dir`.
pub fn write_reports(report: &ConversionReport, output_dir: &Path) -> Result<()> {
    io_utils::write_text(&output_dir.join(MARKDOWN_REPORT), &render_markdown(report))?;
    let json = serde_json::to_string_pretty(report).context("Serializing conversion report")?;
    io_utils::write_text(&output_dir.join(JSON_REPORT), &json)
}
