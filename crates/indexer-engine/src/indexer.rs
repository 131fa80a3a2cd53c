//! Main indexer structure

use colored::Colorize;
use indexer_core::RepoResult;
use indexer_db::CommitCache;
use std::path::{Path, PathBuf};

use crate::agent::{AgentConfig, AgentInvoker};
use crate::discovery::find_git_repos;
use crate::error::DiscoveryError;
use crate::git::Git;
use crate::output::Console;
use crate::skip::SkipMatcher;
use crate::workspace::{default_worktree_root, WorkspaceIsolator};

/// Run-wide settings
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Log what would happen without fetching, checking out or running the agent
    pub dry_run: bool,

    /// Concurrent repository jobs; 0 is treated as 1
    pub workers: usize,

    /// Raw `--skip-repo` patterns
    pub skip_patterns: Vec<String>,

    pub agent: AgentConfig,

    /// Parent directory of the scratch worktrees
    pub worktree_root: PathBuf,

    pub git: Git,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            workers: 1,
            skip_patterns: Vec::new(),
            agent: AgentConfig::default(),
            worktree_root: default_worktree_root(),
            git: Git::new(),
        }
    }
}

/// Main indexer structure
///
/// Borrows the commit cache so the caller can persist it once the batch is
/// done; every worker shares the same instance.
pub struct Indexer<'c> {
    pub(crate) cache: &'c CommitCache,
    pub(crate) console: Console,
    pub(crate) skip: SkipMatcher,
    pub(crate) isolator: WorkspaceIsolator,
    pub(crate) agent: AgentInvoker,
    pub(crate) git: Git,
    pub(crate) dry_run: bool,
    pub(crate) workers: usize,
}

impl<'c> Indexer<'c> {
    pub fn new(config: IndexerConfig, cache: &'c CommitCache, console: Console) -> Self {
        Self {
            cache,
            console,
            skip: SkipMatcher::new(config.skip_patterns),
            isolator: WorkspaceIsolator::new(config.git.clone(), config.worktree_root),
            agent: AgentInvoker::new(config.agent),
            git: config.git,
            dry_run: config.dry_run,
            workers: config.workers.max(1),
        }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Discovers every repository under `root_dir` and indexes them all
    ///
    /// Only discovery can fail; per-repository problems end up in the
    /// returned results.
    pub fn index_root(&self, root_dir: &Path) -> Result<Vec<RepoResult>, DiscoveryError> {
        self.console
            .line(format!("Scanning for git repositories under: {}", root_dir.display()).bold());
        if self.dry_run {
            self.console
                .line("Dry-run mode: no fetch, worktree or Codex invocations will be executed.".yellow());
        }

        let repos = find_git_repos(root_dir)?;
        log::info!("Found {} repositories under {:?}", repos.len(), root_dir);

        if repos.is_empty() {
            self.console.line("No git repositories found.");
            return Ok(Vec::new());
        }

        self.console.line(format!(
            "Found {} repositories; running with {} worker(s).",
            repos.len(),
            self.effective_workers(repos.len())
        ));

        Ok(self.run_all(&repos, root_dir))
    }
}
