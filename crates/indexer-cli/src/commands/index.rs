//! Index command implementation

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use indexer_db::CommitCache;
use indexer_engine::{
    default_worktree_root, AgentConfig, Console, Git, Indexer, IndexerConfig, RunStats,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::helpers::{load_prompt, resolve_root, split_skip_patterns, write_summary_json};
use crate::output::render_summary;

/// Arguments of `codex-indexer index`
pub struct IndexArgs {
    pub root: PathBuf,
    pub dry_run: bool,
    pub summary_json: PathBuf,
    pub commit_cache: PathBuf,
    pub skip_repo: Vec<String>,
    pub agent_timeout: u64,
    pub workers: usize,
    pub agent_bin: PathBuf,
    pub prompt_file: Option<PathBuf>,
    pub worktree_root: Option<PathBuf>,
    pub keep_alive_secs: u64,
}

/// Indexes every repository under the root directory
pub fn cmd_index(args: IndexArgs) -> Result<()> {
    let root = resolve_root(&args.root)?;

    let cache = CommitCache::open(&args.commit_cache)
        .with_context(|| format!("Failed to load commit cache {:?}", args.commit_cache))?;
    log::info!(
        "Loaded commit cache with {} entries from {:?}",
        cache.entry_count(),
        args.commit_cache
    );

    let prompt = load_prompt(args.prompt_file.as_deref())?;

    let config = IndexerConfig {
        dry_run: args.dry_run,
        workers: args.workers,
        skip_patterns: split_skip_patterns(&args.skip_repo),
        agent: AgentConfig {
            program: args.agent_bin,
            prompt,
            timeout: None,
            keep_alive: Duration::from_secs(args.keep_alive_secs.max(1)),
        }
        .with_timeout(Duration::from_secs(args.agent_timeout)),
        worktree_root: args.worktree_root.unwrap_or_else(default_worktree_root),
        git: Git::new(),
    };

    let console = Console::stdio();
    let indexer = Indexer::new(config, &cache, console.clone());

    let started = Instant::now();
    let results = indexer
        .index_root(&root)
        .context("Failed to discover repositories")?;
    let stats = RunStats::from_results(&results, started.elapsed());
    log::info!("{}", stats);

    if !results.is_empty() {
        console.line("Summary:".bright_cyan().bold());
        console.line(render_summary(&results));
        console.line(stats.tally());
    }

    let report = write_summary_json(&args.summary_json, &root, args.dry_run, &results)
        .with_context(|| format!("Failed to write summary to {:?}", args.summary_json));
    if report.is_ok() {
        console.line(format!("Summary written to {}", args.summary_json.display()).dimmed());
    }

    // A dry run never changes the cache
    let saved = if args.dry_run {
        Ok(())
    } else {
        cache.persist().context("Failed to save commit cache")
    };

    match (report, saved) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(e), Err(save)) => Err(anyhow!("{:#} (cache save failed: {:#})", e, save)),
    }
}
