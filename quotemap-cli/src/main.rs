//! QuoteMap CLI — mapping build, quote download, and read-back commands.
//!
//! Commands:
//! - `build-map` — normalize the Signals universe and write the mapping table
//! - `download` — fetch daily quotes for every mapped ticker
//! - `show` — print the date range and row count of a saved ticker

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quotemap_core::config::{Settings, EODHD_TOKEN_ENV};
use quotemap_core::data::QuoteStore;
use quotemap_runner::{
    build_mapping, default_start_date, run_download, DownloadOptions, StdoutProgress,
};

#[derive(Parser)]
#[command(
    name = "quotemap",
    about = "QuoteMap CLI — map Signals tickers to data vendors and download daily quotes"
)]
struct Cli {
    /// Path to a TOML settings file. Defaults are used for missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the canonical → vendor ticker mapping table.
    BuildMap,
    /// Download daily quotes for every ticker in the mapping table.
    Download {
        /// Only fetch tickers in the live universe.
        #[arg(long, default_value_t = false)]
        live: bool,

        /// First date to request (YYYY-MM-DD). Defaults to 2000-01-01.
        #[arg(long = "startdate")]
        start_date: Option<String>,
    },
    /// Show the saved quote series for one canonical ticker.
    Show {
        /// Canonical ticker, e.g. "VOD LN".
        ticker: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::BuildMap => run_build_map(&settings),
        Commands::Download { live, start_date } => run_download_cmd(&settings, live, start_date),
        Commands::Show { ticker } => run_show(&settings, &ticker),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    Ok(settings.with_token_from_env())
}

fn run_build_map(settings: &Settings) -> Result<()> {
    let report = build_mapping(settings).context("building mapping table")?;

    println!("Mapping table: {}", settings.map_file.display());
    println!("  tickers:     {}", report.tickers);
    println!("  aliases:     {}", report.aliases);
    println!("  overrides:   {}", report.overrides);
    for (provider, count) in &report.provider_counts {
        println!("  {provider:<12} {count}");
    }
    println!("  fingerprint: {}", report.fingerprint);
    Ok(())
}

fn parse_start_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --startdate '{s}', expected YYYY-MM-DD")),
        None => Ok(default_start_date()),
    }
}

fn run_download_cmd(settings: &Settings, live: bool, start_date: Option<String>) -> Result<()> {
    let options = DownloadOptions {
        start: parse_start_date(start_date.as_deref())?,
        live_only: live,
    };

    if settings.has_placeholder_token() {
        warn!(
            env = EODHD_TOKEN_ENV,
            "EODHD token not set; EODHD requests will be rejected"
        );
    }

    let progress = StdoutProgress::new(50);
    let summary = run_download(settings, &options, &progress).context("downloading quotes")?;

    println!(
        "Downloaded {} of {} tickers ({} no data, {} failed, {} skipped)",
        summary.saved, summary.total, summary.no_data, summary.failed, summary.skipped
    );
    if summary.save_failed > 0 {
        println!("  {} series could not be saved", summary.save_failed);
    }
    if summary.ledger_errors > 0 {
        println!("  {} ledger lines could not be written", summary.ledger_errors);
    }
    println!("Status ledger: {}", settings.status_file().display());
    info!(saved = summary.saved, total = summary.total, "done");
    Ok(())
}

fn run_show(settings: &Settings, ticker: &str) -> Result<()> {
    let store = QuoteStore::new(&settings.quote_folder);
    let Some(series) = store
        .load(ticker)
        .with_context(|| format!("reading quotes for {ticker}"))?
    else {
        bail!(
            "no saved quotes for '{ticker}' (looked for {})",
            store.path_for(ticker).display()
        );
    };

    let last = &series.bars()[series.len() - 1];
    println!("{ticker}: {} rows", series.len());
    println!("  from:  {}", series.first_date());
    println!("  to:    {}", series.last_date());
    println!(
        "  last:  close {:.4}  adj close {:.4}  volume {}",
        last.close, last.adjusted_close, last.volume
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_download_flags() {
        let cli = Cli::parse_from([
            "quotemap",
            "download",
            "--live",
            "--startdate",
            "2015-03-02",
            "--config",
            "q.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("q.toml")));
        match cli.command {
            Commands::Download { live, start_date } => {
                assert!(live);
                assert_eq!(start_date.as_deref(), Some("2015-03-02"));
            }
            _ => panic!("expected download"),
        }
    }

    #[test]
    fn start_date_defaults_and_validates() {
        assert_eq!(parse_start_date(None).unwrap(), default_start_date());
        assert_eq!(
            parse_start_date(Some("2010-06-30")).unwrap(),
            NaiveDate::from_ymd_opt(2010, 6, 30).unwrap()
        );
        assert!(parse_start_date(Some("30/06/2010")).is_err());
    }
}
