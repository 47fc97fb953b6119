use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::rename::DEFAULT_RULESET;

pub const DEFAULT_DICTIONARY: &str = "dictionary/rename_dictionary.yaml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Maintain a table/column rename dictionary and apply it to YAML schema definitions",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rename every schema document in a directory using the rename dictionary
    Rename(RenameArgs),
    /// Rename only the listed schema documents
    RenameFiles(RenameFilesArgs),
    /// Extend the rename dictionary with tables and columns seen in schema documents
    Reconcile(ReconcileArgs),
    /// Insert created_by/updated_by columns after created_at/updated_at
    AuditFields(AuditArgs),
    /// Convert a CSV export of a table-design sheet into a schema document
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct RenameOptions {
    /// Rename dictionary YAML file
    #[arg(short, long, default_value = DEFAULT_DICTIONARY)]
    pub dictionary: PathBuf,
    /// Directory containing the schema documents to convert
    #[arg(short = 'i', long = "input-dir")]
    pub input_dir: PathBuf,
    /// Directory receiving converted documents and the conversion report
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,
    /// Ruleset label recorded in each document's conversion_info
    #[arg(long, default_value = DEFAULT_RULESET)]
    pub ruleset: String,
    /// Reconcile the input documents into the dictionary before renaming (saved if changed)
    #[arg(long)]
    pub reconcile: bool,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    #[command(flatten)]
    pub options: RenameOptions,
}

#[derive(Debug, Args)]
pub struct RenameFilesArgs {
    #[command(flatten)]
    pub options: RenameOptions,
    /// File names, relative to --input-dir, to convert
    #[arg(required = true)]
    pub files: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Rename dictionary YAML file
    #[arg(short, long, default_value = DEFAULT_DICTIONARY)]
    pub dictionary: PathBuf,
    /// Directory containing the observed schema documents
    #[arg(short = 'i', long = "input-dir")]
    pub input_dir: PathBuf,
    /// Ignore documents whose file name starts with this prefix
    #[arg(long = "exclude-prefix", default_value = "database")]
    pub exclude_prefix: Option<String>,
    /// Print the dictionary changes as a diff without saving
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Directories whose schema documents are updated in place
    #[arg(short = 'd', long = "dir", required = true, action = clap::ArgAction::Append)]
    pub dirs: Vec<PathBuf>,
    /// Report the fields that would be added without rewriting files
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// CSV export of one table-design sheet
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory receiving `<table_name>.yaml`
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,
    /// Author recorded in the document metadata
    #[arg(long, default_value = "schema-rename")]
    pub author: String,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the sheet export (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
