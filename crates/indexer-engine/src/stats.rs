//! Run statistics

use indexer_core::{RepoResult, RepoStatus};
use std::time::Duration;

use crate::formatting::format_duration;

/// Tally over the results of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ok: usize,
    pub warn: usize,
    pub errors: usize,
    pub skipped: usize,
    pub agent_runs: usize,
    pub elapsed_time: Duration,
}

impl RunStats {
    pub fn from_results(results: &[RepoResult], elapsed_time: Duration) -> Self {
        let mut stats = Self {
            elapsed_time,
            ..Self::default()
        };
        for result in results {
            match result.status() {
                RepoStatus::Ok => stats.ok += 1,
                RepoStatus::Warn => stats.warn += 1,
                RepoStatus::Error => stats.errors += 1,
            }
            if result.is_skipped() {
                stats.skipped += 1;
            }
            if result.codex_ran {
                stats.agent_runs += 1;
            }
        }
        stats
    }

    /// The `OK / Warn / Error` line printed under the summary table
    pub fn tally(&self) -> String {
        format!("OK: {}    Warn: {}    Error: {}", self.ok, self.warn, self.errors)
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Repos: {} ok, {} warn, {} error | {} skipped, {} agent runs | Time: {}",
            self.ok,
            self.warn,
            self.errors,
            self.skipped,
            self.agent_runs,
            format_duration(self.elapsed_time)
        )
    }
}
