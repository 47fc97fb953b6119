//! File-system helpers shared by the commands.
//!
//! - **Document discovery**: `*.yaml` listing in file-name order so batches
//!   are reproducible.
//! - **Text output**: plain and atomic (temporary sibling + rename) writes,
//!   creating parent directories on demand.
//! - **Encoding**: sheet exports are decoded via `encoding_rs`, defaulting to
//!   UTF-8.

use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use encoding_rs::{Encoding, UTF_8};

use crate::error::RenameError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const YAML_EXTENSION: &str = "yaml";

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Opens a headerless, ragged CSV reader; sheet exports rarely have uniform rows.
pub fn open_sheet_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = Box::new(BufReader::new(
        File::open(path).with_context(|| format!("Opening sheet export {path:?}"))?,
    ));
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_reader(reader))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn ensure_input_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(RenameError::InputNotFound(path.to_path_buf()).into())
    }
}

pub fn is_yaml_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(YAML_EXTENSION))
}

/// Lists `*.yaml` files directly under `dir`, sorted by file name.
pub fn list_yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_input_dir(dir)?;
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Listing directory {dir:?}"))? {
        let path = entry
            .with_context(|| format!("Reading entry in {dir:?}"))?
            .path();
        if is_yaml_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Creating directory {parent:?}"))?;
    }
    fs::write(path, contents).with_context(|| format!("Writing {path:?}"))
}

/// Writes `contents` to a temporary sibling and renames it over `path`.
pub fn write_text_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    write_text(&temp_path, contents)?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Replacing {path:?} with {temp_path:?}"))
}

pub fn timestamp_suffix(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Copies `path` byte-for-byte to `<path>.backup_<timestamp>` and returns the copy.
pub fn backup_file(path: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    let mut backup_name = path.as_os_str().to_os_string();
    backup_name.push(format!(".backup_{}", timestamp_suffix(now)));
    let backup_path = PathBuf::from(backup_name);
    fs::copy(path, &backup_path)
        .with_context(|| format!("Backing up {path:?} to {backup_path:?}"))?;
    Ok(backup_path)
}
