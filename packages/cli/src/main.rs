#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `nestwatch`: finds nests in scanner sightings.
//!
//! A single batch run fetches the nesting species and the active event,
//! analyzes every configured area against the scanner database, writes
//! the nests as a `GeoJSON` file and to the `nests` table, and posts a
//! summary per area to Discord.
//!
//! Uses `indicatif-log-bridge` (via [`nestwatch_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the progress bar never fight for the terminal.

mod config;
mod run;

use std::path::PathBuf;

use clap::Parser;
use nestwatch_cli_utils::IndicatifProgress;

use crate::config::Config;
use crate::run::RunOptions;

#[derive(Parser)]
#[command(name = "nestwatch", about = "Detects nests from scanner sightings")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Only consider spawn point and species combinations seen within the
    /// last N hours (overrides `analysis.hours_since_change`)
    #[arg(short = 't', long)]
    hours: Option<u32>,

    /// Analyze and log the results without writing or sending anything
    #[arg(long)]
    dry_run: bool,

    /// Skip Discord delivery
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = nestwatch_cli_utils::init_logger();
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(hours) = args.hours {
        log::info!("Looking back {hours} hours");
        config.analysis.hours_since_change = hours;
    }

    let progress = IndicatifProgress::areas_bar(&multi, "Analyzing areas");
    let options = RunOptions {
        dry_run: args.dry_run,
        notify: !args.no_notify,
    };

    let summary = run::run(&config, options, &progress).await?;

    log::info!(
        "Done: {} areas, {} nests, {} malformed sightings skipped, {} event entries skipped, {} summaries sent",
        summary.areas,
        summary.nests,
        summary.malformed,
        summary.skipped_entries,
        summary.delivered,
    );

    Ok(())
}
