//! One nestwatch run.
//!
//! Order matters for failure safety: every area is analyzed before
//! anything is written, nests are staged before the artifact is replaced,
//! and the nest table is swapped last. Notifications go out only after
//! both were published.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, Utc};
use nestwatch_analyze::progress::AreaProgress;
use nestwatch_analyze::{AreaNests, NestAnalyzer, analyze_areas};
use nestwatch_area::{Area, build_areas, load_boundaries};
use nestwatch_database::nests;
use nestwatch_database::sightings::{self, DuckDbSightingSource};
use nestwatch_nest_models::{NestCandidate, SpeciesId};
use nestwatch_notify::{DiscordNotifier, deliver_all};
use nestwatch_output::features::write_collection;
use nestwatch_output::{Aggregate, SpeciesNames, aggregate};
use nestwatch_species::{
    EligibleSpecies, compute_eligible_species, fetch_active_event, fetch_nesting_species,
};

use crate::config::Config;

/// Switches from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Analyze and log, but write and send nothing.
    pub dry_run: bool,
    /// Deliver summaries.
    pub notify: bool,
}

/// Counters logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Areas analyzed.
    pub areas: usize,
    /// Nests published.
    pub nests: usize,
    /// Sightings skipped as malformed.
    pub malformed: usize,
    /// Event entries that could not be parsed.
    pub skipped_entries: usize,
    /// Summaries delivered.
    pub delivered: usize,
}

/// Loads the configured areas and checks their settings.
///
/// # Errors
///
/// Returns an error if the areas file is unusable or the settings do not
/// match it.
pub fn load_areas(config: &Config) -> Result<Vec<Area>, Box<dyn std::error::Error>> {
    let boundaries = load_boundaries(&config.paths.areas)?;
    let areas = build_areas(boundaries, &config.settings)?;
    config.check_targets(&areas)?;
    Ok(areas)
}

/// Fetches both feeds and computes the eligible species.
///
/// # Errors
///
/// Returns an error if a feed cannot be fetched.
pub async fn fetch_eligible(
    client: &reqwest::Client,
    config: &Config,
) -> Result<EligibleSpecies, Box<dyn std::error::Error>> {
    let full = fetch_nesting_species(client, &config.feeds.species_url).await?;
    let event = fetch_active_event(client, &config.feeds.event_url).await?;

    let eligible = compute_eligible_species(&full, event.as_ref(), Local::now().naive_local());
    log::info!(
        "{} eligible species ({} boosted by event)",
        eligible.species.len(),
        eligible.boosted.len()
    );

    Ok(eligible)
}

/// Analyzes every area against the database, then writes the artifact
/// and the nest table unless `dry_run` is set.
///
/// # Errors
///
/// Returns an error if the database cannot be read or an output cannot be
/// written. Nothing is published in that case.
pub fn analyze_and_publish(
    config: &Config,
    areas: &[Area],
    eligible: &BTreeSet<SpeciesId>,
    now: DateTime<Utc>,
    dry_run: bool,
    progress: &dyn AreaProgress,
) -> Result<(Vec<AreaNests>, Aggregate), Box<dyn std::error::Error>> {
    let mut conn = sightings::open(&config.paths.database)?;
    log::info!(
        "{} sightings in {}",
        sightings::get_record_count(&conn)?,
        config.paths.database.display()
    );

    let analyzer = NestAnalyzer::new(config.analysis.clone(), now);
    let results = {
        let source = DuckDbSightingSource::new(&conn);
        analyze_areas(&analyzer, areas, eligible, &source, progress)?
    };

    let names = match &config.paths.locale_dir {
        Some(dir) => SpeciesNames::load(dir, &config.discord.language)?,
        None => SpeciesNames::default(),
    };
    let aggregate = aggregate(areas, &results, &config.discord.template.text, &names);

    if dry_run {
        for summary in &aggregate.summaries {
            log::info!("[dry run] {}", summary.title);
            for line in &summary.lines {
                log::info!("[dry run]   {line}");
            }
        }
        log::info!(
            "[dry run] Would write {} nests to {}",
            aggregate.nest_count(),
            config.paths.output.display()
        );
        return Ok((results, aggregate));
    }

    let all_nests: Vec<NestCandidate> = results
        .iter()
        .flat_map(|r| r.nests.iter().cloned())
        .collect();

    nests::stage(&conn, &all_nests, now)?;
    write_collection(&config.paths.output, &aggregate.collection)?;
    nests::swap_staged(&mut conn)?;

    Ok((results, aggregate))
}

/// Runs the whole job.
///
/// # Errors
///
/// Returns the first error; see [`analyze_and_publish`] for what is left
/// untouched.
pub async fn run(
    config: &Config,
    options: RunOptions,
    progress: &dyn AreaProgress,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let now = Utc::now();

    let areas = load_areas(config)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("nestwatch/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let eligible = fetch_eligible(&client, config).await?;

    let (results, aggregate) = analyze_and_publish(
        config,
        &areas,
        &eligible.species,
        now,
        options.dry_run,
        progress,
    )?;

    let mut summary = RunSummary {
        areas: results.len(),
        nests: aggregate.nest_count(),
        malformed: results.iter().map(|r| r.stats.malformed).sum(),
        skipped_entries: eligible.skipped.len(),
        delivered: 0,
    };

    if options.dry_run || !options.notify {
        log::info!("Skipping notifications");
    } else if !aggregate.summaries.is_empty() {
        let notifier = DiscordNotifier::new(
            client,
            config.discord.token.clone(),
            config.discord.template.embed.clone(),
        );
        summary.delivered = deliver_all(&notifier, &aggregate.summaries).await?;
    }

    Ok(summary)
}
