//! The two top-level jobs: building the mapping table and downloading quotes.
//!
//! Both read every input before producing any output, so a bad reference,
//! override or map file aborts the job without touching existing artifacts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use quotemap_core::config::Settings;
use quotemap_core::data::QuoteStore;
use quotemap_core::mapping::MappingTable;
use quotemap_core::reference::{ReferenceError, ReferenceLoader};
use quotemap_core::ticker::{AliasTable, OverrideStore, Provider};
use quotemap_core::universe::{load_historical, load_live, Universe};

use crate::ledger::{LedgerError, StatusLedger};
use crate::pipeline::{FetchPipeline, FetchSummary, PipelineConfig, PipelineError, ProviderSet};
use crate::progress::FetchProgress;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// What a mapping build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub tickers: usize,
    pub aliases: usize,
    pub overrides: usize,
    pub provider_counts: BTreeMap<Provider, usize>,
    /// BLAKE3 hex digest of the written CSV.
    pub fingerprint: String,
}

/// Load the universes, alias table and overrides, then write the mapping table.
pub fn build_mapping(settings: &Settings) -> Result<BuildReport, JobError> {
    let loader = ReferenceLoader::new(settings.request_timeout())?;

    let historical = load_historical(&loader, &settings.historical_universe_url)?;
    let live = load_live(&loader, &settings.live_universe_url)?;
    let universe = historical.union(&live);
    info!(tickers = universe.len(), "universe assembled");

    let aliases = AliasTable::from_csv(
        &loader.fetch(&settings.alias_url)?,
        &settings.alias_url,
    )?;
    info!(aliases = aliases.len(), "alias table loaded");

    let overrides = OverrideStore::from_file(&settings.override_file)?;
    info!(
        overrides = overrides.len(),
        path = %settings.override_file.display(),
        "overrides loaded"
    );

    let table = MappingTable::build(&universe, &aliases, &overrides);
    table.save(&settings.map_file)?;
    let fingerprint = table.fingerprint()?;

    let provider_counts = table.provider_counts();
    for (provider, count) in &provider_counts {
        info!(%provider, count, "mapped");
    }
    info!(
        path = %settings.map_file.display(),
        rows = table.len(),
        %fingerprint,
        "mapping table written"
    );

    Ok(BuildReport {
        tickers: table.len(),
        aliases: aliases.len(),
        overrides: overrides.len(),
        provider_counts,
        fingerprint,
    })
}

/// Options for one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub start: NaiveDate,
    /// Only fetch tickers in the live universe.
    pub live_only: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            start: default_start_date(),
            live_only: false,
        }
    }
}

/// First date requested when none is given: 2000-01-01.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

/// Read the mapping table (restricted to the live universe if asked).
pub fn load_download_table(
    settings: &Settings,
    options: &DownloadOptions,
) -> Result<MappingTable, JobError> {
    let table = MappingTable::load(&settings.map_file)?;
    info!(
        rows = table.len(),
        path = %settings.map_file.display(),
        "mapping table loaded"
    );
    if !options.live_only {
        return Ok(table);
    }

    let loader = ReferenceLoader::new(settings.request_timeout())?;
    let live: Universe = load_live(&loader, &settings.live_universe_url)?;
    let restricted = table.restrict_to(&live);
    let unmapped = live.iter().filter(|t| restricted.get(t).is_none()).count();
    if unmapped > 0 {
        warn!(unmapped, "live tickers missing from the mapping table");
    }
    info!(rows = restricted.len(), "restricted to live universe");
    Ok(restricted)
}

/// Fetch every mapped ticker with the real HTTP providers.
pub fn run_download(
    settings: &Settings,
    options: &DownloadOptions,
    progress: &dyn FetchProgress,
) -> Result<FetchSummary, JobError> {
    let providers = ProviderSet::from_settings(settings)?;
    run_download_with(settings, options, providers, progress)
}

/// [`run_download`] with caller-supplied providers.
pub fn run_download_with(
    settings: &Settings,
    options: &DownloadOptions,
    providers: ProviderSet,
    progress: &dyn FetchProgress,
) -> Result<FetchSummary, JobError> {
    let table = load_download_table(settings, options)?;

    let store = QuoteStore::new(&settings.quote_folder);
    let ledger = StatusLedger::create(&settings.status_file())?;
    info!(path = %ledger.path().display(), "status ledger truncated");

    let pipeline = FetchPipeline::new(PipelineConfig::from_settings(settings, options.start), providers);
    Ok(pipeline.run(&table, &store, &ledger, progress)?)
}
