//! QuoteMap Runner — job orchestration on top of `quotemap-core`.
//!
//! This crate provides:
//! - The mapping build job (universes + aliases + overrides → mapping CSV)
//! - The concurrent fetch pipeline with per-ticker retries
//! - The append-only download status ledger
//! - Progress reporting hooks

pub mod jobs;
pub mod ledger;
pub mod pipeline;
pub mod progress;

pub use jobs::{
    build_mapping, default_start_date, load_download_table, run_download, run_download_with,
    BuildReport, DownloadOptions, JobError,
};
pub use ledger::{LedgerError, StatusLedger, StatusRecord, COUNT_FAILED, COUNT_NO_DATA};
pub use pipeline::{
    FetchPipeline, FetchSummary, PipelineConfig, PipelineError, ProviderSet, TaskOutcome,
    EMPTY_VENDOR_STATUS,
};
pub use progress::{FetchProgress, NoProgress, StdoutProgress};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn ledger_is_send_sync() {
        assert_send::<StatusLedger>();
        assert_sync::<StatusLedger>();
        assert_send::<StatusRecord>();
        assert_sync::<StatusRecord>();
    }

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<FetchPipeline>();
        assert_sync::<FetchPipeline>();
        assert_send::<ProviderSet>();
        assert_sync::<ProviderSet>();
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn progress_is_send_sync() {
        assert_send::<StdoutProgress>();
        assert_sync::<StdoutProgress>();
    }
}
