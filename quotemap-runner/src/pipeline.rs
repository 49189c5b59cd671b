//! Concurrent fetch pipeline.
//!
//! Every mapping row becomes one task. Tasks run on a private rayon pool, one
//! ticker per work item, in an order shuffled once before dispatch. Attempts
//! for one ticker are strictly sequential:
//!
//! ```text
//! Pending ──► Attempting(1) ──ok──► Succeeded ──► persist
//!                  │ err
//!                  ▼
//!             Attempting(n+1) … Attempting(retry_count) ──err──► Exhausted
//! ```
//!
//! Each attempt writes one ledger line. A result without data is terminal and
//! never retried; only errors are.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use quotemap_core::config::Settings;
use quotemap_core::data::{
    EodhdProvider, FetchOutcome, QuoteProvider, QuoteStore, StoreError, YahooProvider,
};
use quotemap_core::mapping::{MappingRow, MappingTable};
use quotemap_core::ticker::Provider;

use crate::ledger::{StatusLedger, StatusRecord, COUNT_FAILED, COUNT_NO_DATA};
use crate::progress::FetchProgress;

/// Status text for rows that have nothing to fetch.
pub const EMPTY_VENDOR_STATUS: &str = "vendor ticker cannot be empty";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("failed to build HTTP client for {provider}: {message}")]
    Http { provider: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// First date requested from every provider.
    pub start: NaiveDate,
    /// Attempts per ticker, including the first.
    pub retry_count: u32,
    /// Fixed wait between a failed attempt and the next one.
    pub retry_wait: Duration,
    pub max_workers: usize,
    /// Seed for the dispatch shuffle; `None` draws one from the OS.
    pub shuffle_seed: Option<u64>,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings, start: NaiveDate) -> Self {
        Self {
            start,
            retry_count: settings.retry_count,
            retry_wait: settings.retry_wait(),
            max_workers: settings.max_workers,
            shuffle_seed: None,
        }
    }
}

/// One adapter per fetchable provider.
pub struct ProviderSet {
    eodhd: Box<dyn QuoteProvider>,
    yahoo: Box<dyn QuoteProvider>,
}

impl ProviderSet {
    pub fn new(eodhd: Box<dyn QuoteProvider>, yahoo: Box<dyn QuoteProvider>) -> Self {
        Self { eodhd, yahoo }
    }

    /// Real HTTP adapters configured from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let eodhd = EodhdProvider::new(
            settings.eodhd_base_url.clone(),
            settings.eodhd_token.clone(),
            settings.request_timeout(),
        )
        .map_err(|e| http_error("eodhd", e))?;
        let yahoo = YahooProvider::new(settings.yahoo_base_url.clone(), settings.request_timeout())
            .map_err(|e| http_error("yahoo", e))?;
        Ok(Self::new(Box::new(eodhd), Box::new(yahoo)))
    }

    /// Adapter for `provider`; `None` for [`Provider::Ignore`].
    pub fn get(&self, provider: Provider) -> Option<&dyn QuoteProvider> {
        match provider {
            Provider::Eodhd => Some(self.eodhd.as_ref()),
            Provider::Yahoo => Some(self.yahoo.as_ref()),
            Provider::Ignore => None,
        }
    }
}

fn http_error(provider: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Http {
        provider: provider.to_string(),
        message: err.to_string(),
    }
}

// ─── Task state machine ──────────────────────────────────────────────

#[derive(Debug)]
enum TaskState {
    Pending,
    Attempting(u32),
    Succeeded(FetchOutcome),
    Exhausted,
}

/// How one ticker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// No vendor ticker or no adapter; nothing was requested.
    Skipped,
    /// Series fetched and written to the store.
    Saved,
    /// Request succeeded but the upstream had fewer than two rows.
    NoData,
    /// Series fetched but the store write failed.
    SaveFailed,
    /// Every attempt failed.
    Exhausted,
}

/// Counts for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub total: usize,
    /// Tickers whose request completed (with or without data).
    pub succeeded: usize,
    pub no_data: usize,
    /// Tickers whose every attempt failed.
    pub failed: usize,
    pub skipped: usize,
    pub saved: usize,
    pub save_failed: usize,
    /// Ledger lines that could not be written.
    pub ledger_errors: usize,
}

impl FetchSummary {
    fn tally(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Saved => {
                self.succeeded += 1;
                self.saved += 1;
            }
            TaskOutcome::NoData => {
                self.succeeded += 1;
                self.no_data += 1;
            }
            TaskOutcome::SaveFailed => {
                self.succeeded += 1;
                self.save_failed += 1;
            }
            TaskOutcome::Exhausted => self.failed += 1,
        }
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────

pub struct FetchPipeline {
    config: PipelineConfig,
    providers: ProviderSet,
}

/// Shared state of one run, borrowed by every worker.
struct RunContext<'a> {
    store: &'a QuoteStore,
    ledger: &'a StatusLedger,
    progress: &'a dyn FetchProgress,
    total: usize,
    done: AtomicUsize,
    ledger_errors: AtomicUsize,
}

impl FetchPipeline {
    pub fn new(config: PipelineConfig, providers: ProviderSet) -> Self {
        Self { config, providers }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch every row of `table`, persisting series into `store` and
    /// recording every attempt in `ledger`.
    ///
    /// Per-ticker failures are counted, never returned.
    pub fn run(
        &self,
        table: &MappingTable,
        store: &QuoteStore,
        ledger: &StatusLedger,
        progress: &dyn FetchProgress,
    ) -> Result<FetchSummary, PipelineError> {
        store.ensure_dir()?;

        let rows = self.dispatch_order(table);
        let ctx = RunContext {
            store,
            ledger,
            progress,
            total: rows.len(),
            done: AtomicUsize::new(0),
            ledger_errors: AtomicUsize::new(0),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers.max(1))
            .thread_name(|i| format!("fetch-{i}"))
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;

        info!(
            tickers = ctx.total,
            workers = self.config.max_workers,
            start = %self.config.start,
            "starting download"
        );

        let outcomes: Vec<TaskOutcome> = pool.install(|| {
            rows.par_iter()
                .with_max_len(1)
                .map(|row| {
                    let outcome = self.run_task(row, &ctx);
                    let done = ctx.done.fetch_add(1, Ordering::Relaxed) + 1;
                    ctx.progress.ticker_done(&row.canonical_ticker, done, ctx.total);
                    outcome
                })
                .collect()
        });

        let mut summary = FetchSummary {
            total: ctx.total,
            ledger_errors: ctx.ledger_errors.load(Ordering::Relaxed),
            ..FetchSummary::default()
        };
        for outcome in outcomes {
            summary.tally(outcome);
        }

        info!(
            total = summary.total,
            saved = summary.saved,
            no_data = summary.no_data,
            failed = summary.failed,
            skipped = summary.skipped,
            "download finished"
        );
        Ok(summary)
    }

    /// Rows in the order they will be dispatched: shuffled once.
    fn dispatch_order<'t>(&self, table: &'t MappingTable) -> Vec<&'t MappingRow> {
        let mut rows: Vec<&MappingRow> = table.rows().collect();
        let mut rng = match self.config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        rows.shuffle(&mut rng);
        rows
    }

    fn run_task(&self, row: &MappingRow, ctx: &RunContext<'_>) -> TaskOutcome {
        let vendor_ticker = match row.vendor_ticker.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                self.record(ctx, row, COUNT_NO_DATA, EMPTY_VENDOR_STATUS.to_string());
                return TaskOutcome::Skipped;
            }
        };
        let Some(provider) = self.providers.get(row.provider) else {
            self.record(
                ctx,
                row,
                COUNT_NO_DATA,
                format!("no adapter for provider {}", row.provider),
            );
            return TaskOutcome::Skipped;
        };

        let mut state = TaskState::Pending;
        loop {
            state = match state {
                TaskState::Pending => TaskState::Attempting(1),
                TaskState::Attempting(attempt) => {
                    match provider.fetch(vendor_ticker, self.config.start) {
                        Ok(outcome) => {
                            self.record(ctx, row, outcome.row_count(), outcome.status.to_string());
                            TaskState::Succeeded(outcome)
                        }
                        Err(e) => {
                            warn!(
                                ticker = %row.canonical_ticker,
                                vendor_ticker,
                                provider = provider.name(),
                                attempt,
                                error = %e,
                                "fetch failed"
                            );
                            self.record(ctx, row, COUNT_FAILED, e.to_string());
                            if attempt >= self.config.retry_count {
                                TaskState::Exhausted
                            } else {
                                thread::sleep(self.config.retry_wait);
                                TaskState::Attempting(attempt + 1)
                            }
                        }
                    }
                }
                TaskState::Succeeded(outcome) => return self.persist(row, outcome, ctx),
                TaskState::Exhausted => return TaskOutcome::Exhausted,
            };
        }
    }

    fn persist(&self, row: &MappingRow, outcome: FetchOutcome, ctx: &RunContext<'_>) -> TaskOutcome {
        let Some(series) = outcome.series else {
            debug!(ticker = %row.canonical_ticker, status = outcome.status, "no data");
            return TaskOutcome::NoData;
        };
        match ctx.store.write(&row.canonical_ticker, &series) {
            Ok(path) => {
                debug!(
                    ticker = %row.canonical_ticker,
                    count = series.len(),
                    path = %path.display(),
                    "saved"
                );
                TaskOutcome::Saved
            }
            Err(e) => {
                warn!(ticker = %row.canonical_ticker, error = %e, "failed to save quotes");
                TaskOutcome::SaveFailed
            }
        }
    }

    fn record(&self, ctx: &RunContext<'_>, row: &MappingRow, count: i64, status: String) {
        let record = StatusRecord {
            canonical_ticker: row.canonical_ticker.clone(),
            alias_ticker: row.alias_str().to_string(),
            provider: row.provider,
            vendor_ticker: row.vendor_ticker_str().to_string(),
            count,
            status,
        };
        if let Err(e) = ctx.ledger.append(&record) {
            ctx.ledger_errors.fetch_add(1, Ordering::Relaxed);
            warn!(ticker = %row.canonical_ticker, error = %e, "failed to write ledger line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotemap_core::ticker::{AliasTable, OverrideStore};
    use quotemap_core::universe::Universe;

    fn table() -> MappingTable {
        let universe = Universe::from_tickers((0..50).map(|i| format!("T{i} US")));
        MappingTable::build(&universe, &AliasTable::new(), &OverrideStore::new())
    }

    fn config(seed: u64) -> PipelineConfig {
        PipelineConfig {
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            retry_count: 3,
            retry_wait: Duration::ZERO,
            max_workers: 2,
            shuffle_seed: Some(seed),
        }
    }

    struct Never;

    impl QuoteProvider for Never {
        fn name(&self) -> &str {
            "never"
        }

        fn fetch(&self, _: &str, _: NaiveDate) -> Result<FetchOutcome, quotemap_core::data::FetchError> {
            Ok(FetchOutcome::no_data(404))
        }
    }

    fn pipeline(seed: u64) -> FetchPipeline {
        FetchPipeline::new(config(seed), ProviderSet::new(Box::new(Never), Box::new(Never)))
    }

    #[test]
    fn shuffle_is_seeded_and_complete() {
        let table = table();
        let a: Vec<&str> = pipeline(7)
            .dispatch_order(&table)
            .iter()
            .map(|r| r.canonical_ticker.as_str())
            .collect();
        let b: Vec<&str> = pipeline(7)
            .dispatch_order(&table)
            .iter()
            .map(|r| r.canonical_ticker.as_str())
            .collect();
        assert_eq!(a, b);

        let sorted: Vec<&str> = table.rows().map(|r| r.canonical_ticker.as_str()).collect();
        assert_ne!(a, sorted, "50 rows should not survive a shuffle in order");
        let mut resorted = a.clone();
        resorted.sort_unstable();
        assert_eq!(resorted, sorted);
    }

    #[test]
    fn ignore_has_no_adapter() {
        let providers = ProviderSet::new(Box::new(Never), Box::new(Never));
        assert!(providers.get(Provider::Ignore).is_none());
        assert!(providers.get(Provider::Eodhd).is_some());
        assert!(providers.get(Provider::Yahoo).is_some());
    }

    #[test]
    fn summary_tally() {
        let mut summary = FetchSummary::default();
        for outcome in [
            TaskOutcome::Saved,
            TaskOutcome::NoData,
            TaskOutcome::Exhausted,
            TaskOutcome::Skipped,
            TaskOutcome::SaveFailed,
        ] {
            summary.tally(outcome);
        }
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.no_data, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.save_failed, 1);
    }

    #[test]
    fn settings_carry_over() {
        let settings = Settings::default();
        let cfg = PipelineConfig::from_settings(&settings, NaiveDate::from_ymd_opt(2010, 5, 1).unwrap());
        assert_eq!(cfg.retry_count, 3);
        assert_eq!(cfg.retry_wait, Duration::from_secs(25));
        assert_eq!(cfg.max_workers, 10);
        assert_eq!(cfg.shuffle_seed, None);
    }
}
