//! Worker pool
//!
//! Results go into a vector pre-sized to the repository count. Each slot is
//! handed to exactly one worker through `par_iter_mut`, so the results need no
//! lock and come back in discovery order.

use indexer_core::RepoResult;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::indexer::Indexer;

impl Indexer<'_> {
    /// Worker count actually used for `repo_count` repositories
    pub fn effective_workers(&self, repo_count: usize) -> usize {
        effective_workers(self.workers, repo_count)
    }

    /// Processes every repository and returns one result per input, in input order
    pub fn run_all(&self, repos: &[PathBuf], root_dir: &Path) -> Vec<RepoResult> {
        let mut results = vec![RepoResult::default(); repos.len()];
        let workers = self.effective_workers(repos.len());

        if workers <= 1 {
            self.run_sequential(&mut results, repos, root_dir);
            return results;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("indexer-worker-{}", i))
            .build();

        match pool {
            Ok(pool) => pool.install(|| {
                results
                    .par_iter_mut()
                    .zip(repos.par_iter())
                    // One repository per task so idle workers pick up the next one
                    .with_max_len(1)
                    .for_each(|(slot, repo)| {
                        *slot = self.process_repo(root_dir, repo);
                    });
            }),
            Err(e) => {
                log::warn!("Could not start {} workers ({}); running sequentially", workers, e);
                self.run_sequential(&mut results, repos, root_dir);
            }
        }

        results
    }

    fn run_sequential(&self, results: &mut [RepoResult], repos: &[PathBuf], root_dir: &Path) {
        for (slot, repo) in results.iter_mut().zip(repos) {
            *slot = self.process_repo(root_dir, repo);
        }
    }
}

/// `max(1, workers)`, capped at the number of repositories
pub fn effective_workers(workers: usize, repo_count: usize) -> usize {
    workers.max(1).min(repo_count.max(1))
}
