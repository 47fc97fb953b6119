//! Applies the rename dictionary to a single schema document.
//!
//! Column lookups are keyed by the table's original name because that is
//! where the dictionary files them. A document that already went through a
//! pass carries its original name in `metadata.conversion_info`, which takes
//! precedence over the current `table_name`; this keeps repeated passes
//! stable.
//!
//! The output file is named after the resolved table. Two documents that
//! resolve to the same table write to the same file and the later one wins;
//! callers that care must check for this themselves.

use anyhow::Result;
use chrono::{Local, NaiveDate};

use crate::{
    dictionary::RenameDictionary,
    document::{ConversionInfo, SchemaDocument},
    error::RenameError,
};

pub const DEFAULT_RULESET: &str = "rename_dictionary.yaml v1";

#[derive(Debug, Clone)]
pub struct RenameContext {
    pub source: String,
    pub ruleset: String,
    pub converted_on: NaiveDate,
}

impl RenameContext {
    pub fn new(source: impl Into<String>, ruleset: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ruleset: ruleset.into(),
            converted_on: Local::now().date_naive(),
        }
    }

    pub fn with_date(mut self, converted_on: NaiveDate) -> Self {
        self.converted_on = converted_on;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub document: SchemaDocument,
    pub original_table_name: String,
    pub new_table_name: String,
    pub columns_renamed: usize,
}

impl RenameOutcome {
    pub fn table_renamed(&self) -> bool {
        self.original_table_name != self.new_table_name
    }

    pub fn output_file_name(&self) -> String {
        output_file_name(&self.new_table_name)
    }
}

pub fn output_file_name(table_name: &str) -> String {
    format!("{table_name}.yaml")
}

/// The table identity the dictionary files this document under.
pub fn original_table_name(document: &SchemaDocument) -> &str {
    document
        .metadata
        .conversion_info
        .as_ref()
        .map(|info| info.original_table_name.as_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(document.table_name.as_str())
}

pub fn rename_document(
    mut document: SchemaDocument,
    dictionary: &RenameDictionary,
    context: &RenameContext,
) -> Result<RenameOutcome> {
    if document.table_name.trim().is_empty() {
        return Err(RenameError::MissingTableName(context.source.clone().into()).into());
    }

    let original_table_name = original_table_name(&document).to_string();
    let new_table_name = dictionary.resolve_table(&original_table_name).to_string();
    document.table_name = new_table_name.clone();

    let mut columns_renamed = 0usize;
    for column in &mut document.columns {
        let resolved = dictionary.resolve_column(&original_table_name, &column.name);
        if resolved == column.name {
            continue;
        }
        let resolved = resolved.to_string();
        if column
            .old_name
            .as_deref()
            .is_none_or(|old| old == column.name)
        {
            column.old_name = Some(column.name.clone());
        }
        column.name = resolved;
        columns_renamed += 1;
    }

    document.metadata.conversion_info = Some(ConversionInfo {
        source_file: context.source.clone(),
        original_table_name: original_table_name.clone(),
        new_table_name: new_table_name.clone(),
        conversion_date: context.converted_on.format("%Y-%m-%d").to_string(),
        applied_rules: context.ruleset.clone(),
    });

    Ok(RenameOutcome {
        document,
        original_table_name,
        new_table_name,
        columns_renamed,
    })
}
