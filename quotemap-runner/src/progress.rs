//! Per-ticker progress reporting for the download pipeline.

use std::io::Write;

/// Receives one notification per finished ticker. Called from worker threads.
pub trait FetchProgress: Send + Sync {
    fn ticker_done(&self, canonical_ticker: &str, done: usize, total: usize);
}

/// Discards all progress.
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn ticker_done(&self, _canonical_ticker: &str, _done: usize, _total: usize) {}
}

/// Prints a running `[done/total]` counter to stdout, at most once per `every` tickers.
pub struct StdoutProgress {
    every: usize,
}

impl StdoutProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }

    fn should_report(&self, done: usize, total: usize) -> bool {
        done % self.every == 0 || done == total
    }
}

impl Default for StdoutProgress {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FetchProgress for StdoutProgress {
    fn ticker_done(&self, canonical_ticker: &str, done: usize, total: usize) {
        if !self.should_report(done, total) {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[{done}/{total}] {canonical_ticker}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_but_always_reports_last() {
        let progress = StdoutProgress::new(10);
        let reported: Vec<usize> = (1..=25).filter(|&d| progress.should_report(d, 25)).collect();
        assert_eq!(reported, vec![10, 20, 25]);
    }

    #[test]
    fn zero_interval_reports_every_ticker() {
        let progress = StdoutProgress::new(0);
        assert!((1..=4).all(|d| progress.should_report(d, 4)));
    }
}
