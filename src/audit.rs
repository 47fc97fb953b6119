//! Audit column injection.
//!
//! `created_by` goes directly after `created_at` and `updated_by` directly
//! after `updated_at`. Without an anchor column nothing is inserted for that
//! pair. Running the pass again is a no-op.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{cli::AuditArgs, document::ColumnDefinition, document::SchemaDocument, io_utils};

pub const CREATED_AT: &str = "created_at";
pub const CREATED_BY: &str = "created_by";
pub const UPDATED_AT: &str = "updated_at";
pub const UPDATED_BY: &str = "updated_by";
pub const AUDIT_DATA_TYPE: &str = "TEXT";

pub fn created_by_column() -> ColumnDefinition {
    ColumnDefinition::new(CREATED_BY, AUDIT_DATA_TYPE)
        .with_nullable(false)
        .with_description("creator identifier")
}

pub fn updated_by_column() -> ColumnDefinition {
    ColumnDefinition::new(UPDATED_BY, AUDIT_DATA_TYPE)
        .with_nullable(false)
        .with_description("last updater identifier")
}

/// Returns the column sequence with missing audit fields inserted, and how many were added.
pub fn inject_audit_fields(columns: Vec<ColumnDefinition>) -> (Vec<ColumnDefinition>, usize) {
    let has = |name: &str| columns.iter().any(|c| c.name == name);
    let needs_created_by = !has(CREATED_BY) && has(CREATED_AT);
    let needs_updated_by = !has(UPDATED_BY) && has(UPDATED_AT);
    if !needs_created_by && !needs_updated_by {
        return (columns, 0);
    }

    let mut inserted = 0usize;
    let mut output = Vec::with_capacity(columns.len() + 2);
    for column in columns {
        let anchor = column.name.clone();
        output.push(column);
        if needs_created_by && anchor == CREATED_AT && !output.iter().any(|c| c.name == CREATED_BY)
        {
            output.push(created_by_column());
            inserted += 1;
        } else if needs_updated_by
            && anchor == UPDATED_AT
            && !output.iter().any(|c| c.name == UPDATED_BY)
        {
            output.push(updated_by_column());
            inserted += 1;
        }
    }
    (output, inserted)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub files_scanned: usize,
    pub files_updated: usize,
    pub files_failed: usize,
    pub fields_added: usize,
}

pub fn execute(args: &AuditArgs) -> Result<()> {
    let summary = audit_directories(&args.dirs, args.dry_run)?;
    info!(
        "Scanned {} document(s): {} updated, {} failed, {} audit field(s) added",
        summary.files_scanned, summary.files_updated, summary.files_failed, summary.fields_added
    );
    Ok(())
}

pub fn audit_directories(dirs: &[PathBuf], dry_run: bool) -> Result<AuditSummary> {
    let mut summary = AuditSummary::default();
    for dir in dirs {
        if !dir.is_dir() {
            warn!("Skipping missing directory {:?}", dir);
            continue;
        }
        let files = io_utils::list_yaml_files(dir)?;
        if files.is_empty() {
            warn!("No YAML documents found in {:?}", dir);
            continue;
        }
        info!("Processing {} document(s) in {:?}", files.len(), dir);
        for path in files {
            summary.files_scanned += 1;
            match audit_file(&path, dry_run) {
                Ok(0) => info!("{}: no changes", io_utils::file_name(&path)),
                Ok(added) => {
                    summary.files_updated += 1;
                    summary.fields_added += added;
                    info!(
                        "✓ {}: added {added} audit field(s)",
                        io_utils::file_name(&path)
                    );
                }
                Err(err) => {
                    summary.files_failed += 1;
                    warn!("{}: {err:#}", io_utils::file_name(&path));
                }
            }
        }
    }
    Ok(summary)
}

fn audit_file(path: &std::path::Path, dry_run: bool) -> Result<usize> {
    let mut document = SchemaDocument::load(path)?;
    if !document.has_columns() {
        return Ok(0);
    }
    let (columns, added) = inject_audit_fields(std::mem::take(&mut document.columns));
    document.columns = columns;
    if added > 0 && !dry_run {
        document
            .save(path)
            .with_context(|| format!("Rewriting {path:?} with audit fields"))?;
    }
    Ok(added)
}
