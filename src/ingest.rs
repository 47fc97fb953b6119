//! Builds a schema document from a CSV export of one table-design sheet.
//!
//! Layout (columns A..G, rows 1-based):
//!
//! | row | content                                                        |
//! |-----|----------------------------------------------------------------|
//! | 1   | B: table description                                           |
//! | 2   | B: table name (file stem when blank)                           |
//! | 3   | optional header row (`name`/`レコード名` in B or `type`/`タイプ` in C) |
//! | 4.. | A description, B name, C type, D pk (`○`), E nullable, G comment |
//!
//! Column rows end at the first blank name cell.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use encoding_rs::Encoding;
use log::info;
use serde_yaml::Mapping;

use crate::{
    cli::IngestArgs,
    document::{ColumnDefinition, DocumentMetadata, HistoryEntry, SchemaDocument},
    io_utils,
};

const NAME_LABELS: &[&str] = &["name", "レコード名"];
const TYPE_LABELS: &[&str] = &["type", "タイプ"];
const PRIMARY_KEY_MARK: &str = "○";
const FALSE_MARKS: &[&str] = &["false", "no", "×", "x"];

const DESCRIPTION_COL: usize = 0;
const NAME_COL: usize = 1;
const TYPE_COL: usize = 2;
const PRIMARY_KEY_COL: usize = 3;
const NULLABLE_COL: usize = 4;
const COMMENT_COL: usize = 6;

pub const INITIAL_VERSION: &str = "1.0.0";

pub fn execute(args: &IngestArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let rows = read_sheet(&args.input, delimiter, encoding)?;
    let fallback_name = args
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut document = parse_sheet(&rows, &fallback_name);
    document.metadata = initial_metadata(&args.author);

    let output = args
        .output_dir
        .join(crate::rename::output_file_name(&document.table_name));
    document
        .save(&output)
        .with_context(|| format!("Writing ingested schema to {output:?}"))?;
    info!(
        "Ingested table '{}' with {} column(s) into {:?}",
        document.table_name,
        document.columns.len(),
        output
    );
    Ok(())
}

pub fn read_sheet(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<Vec<String>>> {
    let mut reader = io_utils::open_sheet_reader(path, delimiter)?;
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {:?}", idx + 1, path))?;
        rows.push(io_utils::decode_record(&record, encoding)?);
    }
    Ok(rows)
}

fn row_at(rows: &[Vec<String>], idx: usize) -> &[String] {
    rows.get(idx).map(Vec::as_slice).unwrap_or_default()
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|value| value.trim()).unwrap_or_default()
}

fn is_header_row(row: &[String]) -> bool {
    NAME_LABELS.contains(&cell(row, NAME_COL)) || TYPE_LABELS.contains(&cell(row, TYPE_COL))
}

fn parse_nullable(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    lowered.is_empty() || !FALSE_MARKS.contains(&lowered.as_str())
}

pub fn parse_sheet(rows: &[Vec<String>], fallback_table_name: &str) -> SchemaDocument {
    let description = cell(row_at(rows, 0), NAME_COL).to_string();
    let table_name = match cell(row_at(rows, 1), NAME_COL) {
        "" => fallback_table_name.to_string(),
        name => name.to_string(),
    };
    let start = if rows.len() > 2 && is_header_row(row_at(rows, 2)) {
        3
    } else {
        2
    };

    let mut columns = Vec::new();
    for row in rows.iter().skip(start) {
        let name = cell(row, NAME_COL);
        if name.is_empty() {
            break;
        }
        if NAME_LABELS.contains(&name) {
            continue;
        }
        let comment = cell(row, COMMENT_COL);
        columns.push(ColumnDefinition {
            name: name.to_string(),
            old_name: Some(name.to_string()),
            description: cell(row, DESCRIPTION_COL).to_string(),
            data_type: cell(row, TYPE_COL).to_string(),
            primary_key: cell(row, PRIMARY_KEY_COL) == PRIMARY_KEY_MARK,
            nullable: parse_nullable(cell(row, NULLABLE_COL)),
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            extra: Mapping::new(),
        });
    }

    SchemaDocument {
        table_name,
        description,
        columns,
        ..SchemaDocument::default()
    }
}

pub fn initial_metadata(author: &str) -> DocumentMetadata {
    DocumentMetadata {
        description: Some("table definition".to_string()),
        author: Some(author.to_string()),
        history: vec![HistoryEntry {
            version: INITIAL_VERSION.to_string(),
            date: Local::now().format("%Y-%m-%d").to_string(),
            author: author.to_string(),
            comment: "initial import from spreadsheet export".to_string(),
        }],
        ..DocumentMetadata::default()
    }
}
