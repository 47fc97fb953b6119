//! Schema document model and its YAML representation.
//!
//! A [`SchemaDocument`] describes one table: its name, description, ordered
//! [`ColumnDefinition`]s and free-form [`DocumentMetadata`]. Column order
//! mirrors physical order and is never changed here.
//!
//! Documents are written with comment section markers so they stay readable
//! next to hand-maintained definitions:
//!
//! ```text
//! #- metadata -----------------------------------------------
//! metadata:
//!   ...
//!
//! #- tableinfo ----------------------------------------------
//! table_name: users
//!
//! #- columns info -------------------------------------------
//! columns:
//!   ...
//! ```
//!
//! Keys this model does not know about are carried through untouched.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::{error::RenameError, io_utils};

pub const METADATA_MARKER: &str = "#- metadata -----------------------------------------------";
pub const TABLEINFO_MARKER: &str = "#- tableinfo ----------------------------------------------";
pub const COLUMNS_MARKER: &str = "#- columns info -------------------------------------------";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "ColumnDefinition::default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_name: None,
            description: String::new(),
            data_type: data_type.into(),
            primary_key: false,
            nullable: true,
            comment: None,
            extra: Mapping::new(),
        }
    }

    pub const fn default_nullable() -> bool {
        true
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub comment: String,
}

/// Written by the renamer; overwritten on every pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionInfo {
    pub source_file: String,
    pub original_table_name: String,
    #[serde(default)]
    pub new_table_name: String,
    pub conversion_date: String,
    pub applied_rules: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_info: Option<ConversionInfo>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaDocument {
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_columns")]
    pub columns: Vec<ColumnDefinition>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// `columns:` with no value parses as null; treat it like an empty list.
fn deserialize_columns<'de, D>(deserializer: D) -> Result<Vec<ColumnDefinition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ColumnDefinition>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SchemaDocument {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
            ..Self::default()
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reads and parses a document, mapping failures to per-document error kinds.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RenameError::DocumentNotFound(path.to_path_buf()).into());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening schema document {path:?}"))?;
        serde_yaml::from_str(&raw).map_err(|err| {
            RenameError::DocumentParse {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
            .into()
        })
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let body = serde_yaml::to_string(self).context("Serializing schema document to YAML")?;
        Ok(insert_section_markers(&body))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = self.to_yaml_string()?;
        io_utils::write_text(path, &rendered)
            .with_context(|| format!("Writing schema document {path:?}"))
    }
}

fn insert_section_markers(body: &str) -> String {
    let mut output = String::with_capacity(body.len() + 3 * METADATA_MARKER.len());
    output.push_str(METADATA_MARKER);
    output.push('\n');
    for line in body.lines() {
        if line.starts_with("table_name:") {
            output.push('\n');
            output.push_str(TABLEINFO_MARKER);
            output.push('\n');
        } else if line.starts_with("columns:") {
            output.push('\n');
            output.push_str(COLUMNS_MARKER);
            output.push('\n');
        }
        output.push_str(line);
        output.push('\n');
    }
    output
}
