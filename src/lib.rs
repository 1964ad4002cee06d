pub mod cli;
pub mod config;
pub mod confusion;
pub mod error;
pub mod io_utils;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod render;
pub mod report;
mod report_cmd;
pub mod table;
pub mod value;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    config::CompareConfig,
    confusion::ConfusionMatrix,
    error::{AgreementError, AgreementResult},
    matcher::Alignment,
    metrics::AgreementMetrics,
    report::{ComparisonReport, compare},
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("review_agreement", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Overview(args) => report_cmd::execute_overview(&args),
        Commands::Compare(args) => report_cmd::execute_compare(&args),
        Commands::Disagreements(args) => report_cmd::execute_disagreements(&args),
        Commands::Locate(args) => report_cmd::execute_locate(&args),
        Commands::Metrics(args) => report_cmd::execute_metrics(&args),
    }
}
