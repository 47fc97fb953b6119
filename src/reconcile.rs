//! Additive reconciliation of observed schema documents into the rename dictionary.
//!
//! Unseen tables are registered as identity mappings tagged `pre-existing`.
//! Unseen columns get a suggested target, tried in order:
//!
//! 1. an existing mapping for the same column name in any table, scanning
//!    tables in sorted name order (`matched`);
//! 2. the builtin synonym table (`matched`);
//! 3. the name itself (`new`).
//!
//! Documents are filed under the same keys the renamer looks up: the
//! original table name and the column name exactly as written.
//!
//! Existing keys are never touched, so reconciling the same documents twice
//! adds nothing the second time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use similar::TextDiff;

use crate::{
    cli::ReconcileArgs,
    dictionary::{Provenance, RenameDictionary},
    document::SchemaDocument,
    io_utils, rename,
};

const SYNONYMS: &[(&str, &str)] = &[
    ("id", "id"),
    ("user_id", "user_id"),
    ("facility_id", "medical_facility_id"),
    ("medical_facility_id", "medical_facility_id"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("created_by", "created_by"),
    ("updated_by", "updated_by"),
    ("name", "name"),
    ("description", "description"),
    ("status", "status"),
    ("is_active", "is_active"),
    ("sort_order", "sort_order"),
    ("display_order", "display_order"),
];

pub fn builtin_synonym(column_name: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == column_name)
        .map(|(_, to)| *to)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub target: String,
    pub provenance: Provenance,
}

/// Suggests a target name for a column the dictionary has not seen under its table.
pub fn suggest_column_name(dictionary: &RenameDictionary, column_name: &str) -> Suggestion {
    let cross_table = dictionary
        .column_tables()
        .sorted_by(|(left, _), (right, _)| left.cmp(right))
        .find_map(|(_, columns)| columns.get(column_name));
    if let Some(entry) = cross_table {
        return Suggestion {
            target: entry.new.clone(),
            provenance: Provenance::Matched,
        };
    }
    if let Some(target) = builtin_synonym(column_name) {
        return Suggestion {
            target: target.to_string(),
            provenance: Provenance::Matched,
        };
    }
    Suggestion {
        target: column_name.to_string(),
        provenance: Provenance::New,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnAddition {
    pub table: String,
    pub column: String,
    pub target: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub documents_seen: usize,
    pub documents_skipped: usize,
    pub tables_added: Vec<String>,
    pub columns_added: Vec<ColumnAddition>,
}

impl ReconcileSummary {
    pub fn matched_count(&self) -> usize {
        self.columns_added
            .iter()
            .filter(|c| c.provenance == Provenance::Matched)
            .count()
    }

    pub fn new_count(&self) -> usize {
        self.columns_added
            .iter()
            .filter(|c| c.provenance == Provenance::New)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.tables_added.is_empty() && self.columns_added.is_empty()
    }
}

pub fn reconcile<'a, I>(dictionary: &mut RenameDictionary, documents: I) -> ReconcileSummary
where
    I: IntoIterator<Item = &'a SchemaDocument>,
{
    let mut summary = ReconcileSummary::default();
    for document in documents {
        reconcile_document(dictionary, document, &mut summary);
    }
    summary
}

pub fn reconcile_document(
    dictionary: &mut RenameDictionary,
    document: &SchemaDocument,
    summary: &mut ReconcileSummary,
) {
    summary.documents_seen += 1;
    let table = rename::original_table_name(document);
    if table.trim().is_empty() {
        warn!("Skipping document without table_name during reconciliation");
        summary.documents_skipped += 1;
        return;
    }

    if dictionary.add_table(table, table, &document.description, Provenance::PreExisting) {
        info!("  table added: {table}");
        summary.tables_added.push(table.to_string());
    }

    for column in &document.columns {
        let name = column.name.as_str();
        if name.trim().is_empty() || dictionary.contains_column(table, name) {
            continue;
        }
        let suggestion = suggest_column_name(dictionary, name);
        if dictionary.add_column(
            table,
            name,
            &suggestion.target,
            &column.description,
            suggestion.provenance,
        ) {
            info!(
                "  column added: {table}.{name} -> {} ({})",
                suggestion.target, suggestion.provenance
            );
            summary.columns_added.push(ColumnAddition {
                table: table.to_string(),
                column: name.to_string(),
                target: suggestion.target,
                provenance: suggestion.provenance,
            });
        }
    }
}

/// Loads every document under `dir` not excluded by `exclude_prefix`; unreadable ones are skipped.
pub fn load_observed_documents(
    dir: &Path,
    exclude_prefix: Option<&str>,
) -> Result<Vec<(PathBuf, SchemaDocument)>> {
    let mut documents = Vec::new();
    for path in io_utils::list_yaml_files(dir)? {
        let file_name = io_utils::file_name(&path);
        if exclude_prefix.is_some_and(|prefix| !prefix.is_empty() && file_name.starts_with(prefix))
        {
            continue;
        }
        match SchemaDocument::load(&path) {
            Ok(document) => documents.push((path, document)),
            Err(err) => warn!("Skipping {file_name}: {err:#}"),
        }
    }
    Ok(documents)
}

pub fn execute(args: &ReconcileArgs) -> Result<()> {
    let mut dictionary = RenameDictionary::load(&args.dictionary)?;
    let observed = load_observed_documents(&args.input_dir, args.exclude_prefix.as_deref())
        .with_context(|| format!("Scanning schema documents in {:?}", args.input_dir))?;
    info!("Reconciling {} document(s)", observed.len());

    let before = dictionary.to_yaml_string()?;
    let summary = reconcile(&mut dictionary, observed.iter().map(|(_, doc)| doc));
    info!(
        "Reconciliation added {} table(s) and {} column(s) ({} matched, {} new)",
        summary.tables_added.len(),
        summary.columns_added.len(),
        summary.matched_count(),
        summary.new_count()
    );

    if args.dry_run {
        let after = dictionary.to_yaml_string()?;
        let diff = TextDiff::from_lines(&before, &after);
        print!(
            "{}",
            diff.unified_diff()
                .context_radius(2)
                .header("rename_dictionary (current)", "rename_dictionary (reconciled)")
        );
        return Ok(());
    }

    dictionary.save_if_changed()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ColumnDefinition;

    fn document(table: &str, columns: &[&str]) -> SchemaDocument {
        SchemaDocument::new(
            table,
            columns
                .iter()
                .map(|name| ColumnDefinition::new(*name, "TEXT"))
                .collect(),
        )
    }

    #[test]
    fn synonym_is_used_when_no_cross_table_match() {
        let dict = RenameDictionary::new();
        let suggestion = suggest_column_name(&dict, "facility_id");
        assert_eq!(suggestion.target, "medical_facility_id");
        assert_eq!(suggestion.provenance, Provenance::Matched);
    }

    #[test]
    fn unknown_column_falls_back_to_identity() {
        let dict = RenameDictionary::new();
        let suggestion = suggest_column_name(&dict, "weird_flag");
        assert_eq!(suggestion.target, "weird_flag");
        assert_eq!(suggestion.provenance, Provenance::New);
    }

    #[test]
    fn cross_table_match_beats_synonym_and_scans_sorted_tables() {
        let mut dict = RenameDictionary::new();
        dict.add_column("zeta", "facility_id", "z_facility", "", Provenance::PreExisting);
        dict.add_column("alpha", "facility_id", "clinic_id", "", Provenance::PreExisting);
        let suggestion = suggest_column_name(&dict, "facility_id");
        assert_eq!(suggestion.target, "clinic_id");
        assert_eq!(suggestion.provenance, Provenance::Matched);
    }

    #[test]
    fn reconcile_registers_identity_tables_and_suggested_columns() {
        let mut dict = RenameDictionary::new();
        let docs = vec![document("orders", &["facility_id", "total"])];
        let summary = reconcile(&mut dict, &docs);

        assert_eq!(summary.tables_added, vec!["orders".to_string()]);
        assert_eq!(dict.resolve_table("orders"), "orders");
        assert_eq!(
            dict.table_entry("orders").unwrap().provenance(),
            Some(Provenance::PreExisting)
        );
        assert_eq!(dict.resolve_column("orders", "facility_id"), "medical_facility_id");
        assert_eq!(summary.matched_count(), 1);
        assert_eq!(summary.new_count(), 1);
    }

    #[test]
    fn earlier_documents_feed_later_matches() {
        let mut dict = RenameDictionary::new();
        dict.add_column("legacy", "cust_no", "customer_id", "", Provenance::PreExisting);
        let docs = vec![document("invoices", &["cust_no"])];
        reconcile(&mut dict, &docs);
        assert_eq!(dict.resolve_column("invoices", "cust_no"), "customer_id");
    }

    #[test]
    fn second_run_adds_nothing() {
        let mut dict = RenameDictionary::new();
        let docs = vec![document("orders", &["id", "total"]), document("users", &["uid"])];
        let first = reconcile(&mut dict, &docs);
        assert!(!first.is_empty());
        let snapshot = dict.to_yaml_string().unwrap();
        let second = reconcile(&mut dict, &docs);
        assert!(second.is_empty());
        assert_eq!(dict.to_yaml_string().unwrap(), snapshot);
    }

    #[test]
    fn documents_without_table_name_are_skipped() {
        let mut dict = RenameDictionary::new();
        let docs = vec![document("  ", &["id"])];
        let summary = reconcile(&mut dict, &docs);
        assert_eq!(summary.documents_skipped, 1);
        assert_eq!(dict.table_count(), 0);
        assert_eq!(dict.column_count(), 0);
    }

    #[test]
    fn reconciled_entries_are_the_ones_rename_reads() {
        let mut dict = RenameDictionary::new();
        dict.add_column("legacy", "facility_id ", "clinic_id", "", Provenance::PreExisting);
        let docs = vec![document("users ", &["facility_id "])];
        reconcile(&mut dict, &docs);
        assert!(dict.contains_column("users ", "facility_id "));

        let context = rename::RenameContext::new("users.yaml", rename::DEFAULT_RULESET);
        let outcome = rename::rename_document(docs[0].clone(), &dict, &context).unwrap();
        assert_eq!(outcome.document.columns[0].name, "clinic_id");
    }

    #[test]
    fn renamed_documents_are_filed_under_their_original_table() {
        let mut dict = RenameDictionary::from_yaml_str(
            "tables:\n  users:\n    new: app_users\n",
        )
        .unwrap();
        let context = rename::RenameContext::new("users.yaml", rename::DEFAULT_RULESET);
        let converted =
            rename::rename_document(document("users", &["uid"]), &dict, &context).unwrap();
        let mut rerun = converted.document;
        rerun.columns.push(ColumnDefinition::new("facility_id", "TEXT"));

        let summary = reconcile(&mut dict, [&rerun]);
        assert!(summary.tables_added.is_empty());
        assert!(!dict.contains_table("app_users"));
        assert_eq!(dict.resolve_column("users", "facility_id"), "medical_facility_id");

        let again = rename::rename_document(rerun, &dict, &context).unwrap();
        assert_eq!(again.new_table_name, "app_users");
        assert_eq!(again.document.column_names(), vec!["uid", "medical_facility_id"]);
    }
}
