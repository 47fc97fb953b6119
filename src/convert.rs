//! Batch and selective rename commands.
//!
//! Startup problems (no dictionary, no input directory) abort the run. Any
//! problem with a single document is captured in that document's report
//! record and the loop moves on, so the process still exits zero.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};

use crate::{
    cli::{RenameArgs, RenameFilesArgs, RenameOptions},
    dictionary::RenameDictionary,
    document::SchemaDocument,
    io_utils, reconcile,
    rename::{self, RenameContext},
    report::{self, ConversionReport, ReportBuilder},
};

pub fn execute_batch(args: &RenameArgs) -> Result<()> {
    let mut dictionary = RenameDictionary::load(&args.options.dictionary)?;
    let inputs = io_utils::list_yaml_files(&args.options.input_dir)?;
    if inputs.is_empty() {
        warn!("No YAML documents found in {:?}", args.options.input_dir);
    }
    run_and_report(&args.options, &mut dictionary, &inputs)
}

pub fn execute_selected(args: &RenameFilesArgs) -> Result<()> {
    let mut dictionary = RenameDictionary::load(&args.options.dictionary)?;
    io_utils::ensure_input_dir(&args.options.input_dir)?;
    let inputs = args
        .files
        .iter()
        .map(|name| args.options.input_dir.join(name))
        .collect::<Vec<_>>();
    run_and_report(&args.options, &mut dictionary, &inputs)
}

fn run_and_report(
    options: &RenameOptions,
    dictionary: &mut RenameDictionary,
    inputs: &[PathBuf],
) -> Result<()> {
    info!(
        "Converting {} document(s) from {:?} into {:?}",
        inputs.len(),
        options.input_dir,
        options.output_dir
    );
    if options.reconcile {
        reconcile_inputs(dictionary, inputs);
    }

    let report = convert_documents(inputs, dictionary, &options.output_dir, &options.ruleset);

    if options.reconcile {
        dictionary.save_if_changed()?;
    }
    report::write_reports(&report, &options.output_dir)
        .with_context(|| format!("Writing conversion report to {:?}", options.output_dir))?;
    print!("{}", report::render_summary(&report));
    info!(
        "Converted {}/{} document(s); report written to {:?}",
        report.success_count,
        report.total_files,
        options.output_dir.join(report::MARKDOWN_REPORT)
    );
    Ok(())
}

/// Extends the dictionary from every readable input; unreadable ones fail later, during conversion.
fn reconcile_inputs(dictionary: &mut RenameDictionary, inputs: &[PathBuf]) {
    let documents = inputs
        .iter()
        .filter_map(|path| match SchemaDocument::load(path) {
            Ok(document) => Some(document),
            Err(err) => {
                debug!("Not reconciling {:?}: {err:#}", path);
                None
            }
        })
        .collect::<Vec<_>>();
    let summary = reconcile::reconcile(dictionary, &documents);
    info!(
        "Reconciliation added {} table(s) and {} column(s)",
        summary.tables_added.len(),
        summary.columns_added.len()
    );
}

/// Renames each document in order and writes it under `output_dir`, recording every outcome.
pub fn convert_documents(
    inputs: &[PathBuf],
    dictionary: &RenameDictionary,
    output_dir: &Path,
    ruleset: &str,
) -> ConversionReport {
    let mut builder = ReportBuilder::new();
    let mut written = HashSet::new();
    for input in inputs {
        let source = io_utils::file_name(input);
        info!("Processing {source}");
        match convert_one(input, &source, dictionary, output_dir, ruleset) {
            Ok((outcome, output_path)) => {
                let output_file = io_utils::file_name(&output_path);
                if !written.insert(output_path.clone()) {
                    debug!("{source} overwrote {:?} written earlier in this run", output_path);
                }
                info!(
                    "  -> {} (table {} -> {}, {} column(s) renamed)",
                    output_file,
                    outcome.original_table_name,
                    outcome.new_table_name,
                    outcome.columns_renamed
                );
                builder.record_success(&source, &outcome, &output_file);
            }
            Err(err) => {
                warn!("  -> {source} failed: {err:#}");
                builder.record_failure(&source, &err);
            }
        }
    }
    builder.finish(Local::now())
}

fn convert_one(
    input: &Path,
    source: &str,
    dictionary: &RenameDictionary,
    output_dir: &Path,
    ruleset: &str,
) -> Result<(rename::RenameOutcome, PathBuf)> {
    let document = SchemaDocument::load(input)?;
    let context = RenameContext::new(source, ruleset);
    let outcome = rename::rename_document(document, dictionary, &context)?;
    let output_path = output_dir.join(outcome.output_file_name());
    outcome.document.save(&output_path)?;
    Ok((outcome, output_path))
}
