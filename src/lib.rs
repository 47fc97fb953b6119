pub mod audit;
pub mod cli;
pub mod convert;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod ingest;
pub mod io_utils;
pub mod reconcile;
pub mod rename;
pub mod report;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("schema_rename", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Rename(args) => convert::execute_batch(&args),
        Commands::RenameFiles(args) => convert::execute_selected(&args),
        Commands::Reconcile(args) => reconcile::execute(&args),
        Commands::AuditFields(args) => audit::execute(&args),
        Commands::Ingest(args) => ingest::execute(&args),
    }
}
