//! The rename dictionary: authoritative old -> new names for tables and columns.
//!
//! ```yaml
//! tables:
//!   users:
//!     new: app_users
//!     description: registered users
//! columns:
//!   users:
//!     uid:
//!       new: user_id
//!       description: user id # matched
//! ```
//!
//! Entries keep their declaration order. Column lookups are always scoped to
//! the table they are filed under. Additions never overwrite an existing key,
//! and the store is only written back when something was added.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::{error::RenameError, io_utils};

/// How a dictionary entry came to exist, stored as a trailing `# tag` in its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    PreExisting,
    Matched,
    New,
}

impl Provenance {
    pub fn tag(&self) -> &'static str {
        match self {
            Provenance::PreExisting => "pre-existing",
            Provenance::Matched => "matched",
            Provenance::New => "new",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "pre-existing" => Some(Provenance::PreExisting),
            "matched" => Some(Provenance::Matched),
            "new" => Some(Provenance::New),
            _ => None,
        }
    }

    pub fn annotate(&self, description: &str) -> String {
        let description = description.trim_end();
        if description.is_empty() {
            format!("# {}", self.tag())
        } else {
            format!("{description} # {}", self.tag())
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingEntry {
    pub new: String,
    #[serde(default)]
    pub description: String,
    /// Curator-owned keys such as `reviewed_by`, carried through untouched.
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

impl MappingEntry {
    pub fn new(new: impl Into<String>, description: &str, provenance: Provenance) -> Self {
        Self {
            new: new.into(),
            description: provenance.annotate(description),
            extra: Mapping::new(),
        }
    }

    /// `None` for hand-curated entries that carry no recognised tag.
    pub fn provenance(&self) -> Option<Provenance> {
        let description = self.description.trim_end();
        let tag = match description.rsplit_once(" # ") {
            Some((_, tag)) => tag,
            None => description.strip_prefix("# ")?,
        };
        Provenance::from_tag(tag)
    }
}

pub type ColumnMappings = IndexMap<String, MappingEntry>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenameDictionary {
    /// Top-level keys other than the two sections, such as `version`.
    #[serde(flatten, default)]
    extra: Mapping,
    #[serde(default, deserialize_with = "deserialize_or_empty")]
    tables: IndexMap<String, MappingEntry>,
    #[serde(default, deserialize_with = "deserialize_or_empty")]
    columns: IndexMap<String, ColumnMappings>,
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(skip)]
    dirty: bool,
}

/// A section written as `tables:` with nothing below it parses as null.
fn deserialize_or_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RenameDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("Parsing rename dictionary YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RenameError::DictionaryNotFound(path.to_path_buf()).into());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening rename dictionary {path:?}"))?;
        let mut dictionary = Self::from_yaml_str(&raw)
            .with_context(|| format!("Loading rename dictionary {path:?}"))?;
        dictionary.path = Some(path.to_path_buf());
        info!(
            "Loaded rename dictionary {:?}: {} table(s), {} column mapping(s)",
            path,
            dictionary.table_count(),
            dictionary.column_count()
        );
        Ok(dictionary)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.values().map(IndexMap::len).sum()
    }

    pub fn resolve_table<'a>(&'a self, old_name: &'a str) -> &'a str {
        self.tables
            .get(old_name)
            .map(|entry| entry.new.as_str())
            .unwrap_or(old_name)
    }

    pub fn resolve_column<'a>(&'a self, table_name: &str, old_name: &'a str) -> &'a str {
        self.columns
            .get(table_name)
            .and_then(|columns| columns.get(old_name))
            .map(|entry| entry.new.as_str())
            .unwrap_or(old_name)
    }

    pub fn contains_table(&self, old_name: &str) -> bool {
        self.tables.contains_key(old_name)
    }

    pub fn contains_column(&self, table_name: &str, old_name: &str) -> bool {
        self.columns
            .get(table_name)
            .is_some_and(|columns| columns.contains_key(old_name))
    }

    pub fn table_entry(&self, old_name: &str) -> Option<&MappingEntry> {
        self.tables.get(old_name)
    }

    pub fn column_entry(&self, table_name: &str, old_name: &str) -> Option<&MappingEntry> {
        self.columns.get(table_name)?.get(old_name)
    }

    pub fn table_entries(&self) -> impl Iterator<Item = (&str, &MappingEntry)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Column mappings grouped by table, in declaration order.
    pub fn column_tables(&self) -> impl Iterator<Item = (&str, &ColumnMappings)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Registers a table mapping unless `old_name` is already present. Returns whether it was added.
    pub fn add_table(
        &mut self,
        old_name: &str,
        new_name: &str,
        description: &str,
        provenance: Provenance,
    ) -> bool {
        if self.tables.contains_key(old_name) {
            return false;
        }
        self.tables.insert(
            old_name.to_string(),
            MappingEntry::new(new_name, description, provenance),
        );
        self.dirty = true;
        debug!("Added table mapping {old_name} -> {new_name} ({provenance})");
        true
    }

    /// Registers a column mapping unless the (table, column) pair is already present.
    pub fn add_column(
        &mut self,
        table_name: &str,
        old_name: &str,
        new_name: &str,
        description: &str,
        provenance: Provenance,
    ) -> bool {
        if self.contains_column(table_name, old_name) {
            return false;
        }
        self.columns
            .entry(table_name.to_string())
            .or_default()
            .insert(
                old_name.to_string(),
                MappingEntry::new(new_name, description, provenance),
            );
        self.dirty = true;
        debug!("Added column mapping {table_name}.{old_name} -> {new_name} ({provenance})");
        true
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing rename dictionary to YAML")
    }

    /// Backs up the current file, then atomically replaces it. Returns the backup path.
    pub fn save(&mut self) -> Result<Option<PathBuf>> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Rename dictionary has no backing file"))?;
        self.save_to(&path)
    }

    pub fn save_to(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        let backup = if path.is_file() {
            Some(io_utils::backup_file(path, Local::now())?)
        } else {
            None
        };
        let rendered = self.to_yaml_string()?;
        io_utils::write_text_atomic(path, &rendered)
            .with_context(|| format!("Writing rename dictionary {path:?}"))?;
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        match &backup {
            Some(backup) => info!("Saved rename dictionary {:?} (backup {:?})", path, backup),
            None => info!("Saved rename dictionary {:?}", path),
        }
        Ok(backup)
    }

    /// Persists only when an addition happened since load. Returns the backup path, if any.
    pub fn save_if_changed(&mut self) -> Result<Option<PathBuf>> {
        if !self.dirty {
            debug!("Rename dictionary unchanged; not saving");
            return Ok(None);
        }
        self.save()
    }
}
