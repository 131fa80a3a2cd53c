//! Codex-Indexer CLI - Batch indexing of git repositories into long-term memory
//!
//! Provides:
//! - Indexing every repository under a directory with `codex exec`
//! - Incremental re-runs driven by a commit cache
//! - Inspecting the commit cache

mod commands;
mod helpers;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indexer_engine::DEFAULT_AGENT_PROGRAM;
use std::path::PathBuf;

use commands::{cmd_index, cmd_stats, IndexArgs};

#[derive(Parser)]
#[command(name = "codex-indexer")]
#[command(about = "Index every git repository under a directory with Codex", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discovers repositories under ROOT and runs the agent on each
    Index {
        /// Directory to scan for git repositories
        root: PathBuf,

        /// Show what would run without fetching, checking out or starting the agent
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Where to write the JSON run summary
        #[arg(long, default_value = "codex_index_summary.json")]
        summary_json: PathBuf,

        /// Commit cache file; an empty value keeps the cache in memory
        #[arg(long, default_value = "codex_index_commits.json")]
        commit_cache: PathBuf,

        /// Repository to exclude (slug, name, relative or absolute path); repeatable, comma-separated
        #[arg(long = "skip-repo", value_name = "PATTERN")]
        skip_repo: Vec<String>,

        /// Per-repository agent timeout in seconds (0 = unbounded)
        #[arg(long, value_name = "SECS", default_value = "0")]
        agent_timeout: u64,

        /// Number of repositories processed in parallel
        #[arg(short = 'j', long, default_value = "1")]
        workers: usize,

        /// Agent executable
        #[arg(long, value_name = "PATH", default_value = DEFAULT_AGENT_PROGRAM)]
        agent_bin: PathBuf,

        /// Replace the built-in instructions with the contents of this file
        #[arg(long, value_name = "PATH")]
        prompt_file: Option<PathBuf>,

        /// Directory for isolated worktrees (default: <temp>/codex-indexer-worktrees)
        #[arg(long, value_name = "PATH")]
        worktree_root: Option<PathBuf>,

        /// Seconds between keep-alive newlines on the agent's stdin
        #[arg(long, value_name = "SECS", default_value = "30")]
        keep_alive_secs: u64,
    },

    /// Shows the contents of the commit cache
    Stats {
        /// Commit cache file
        #[arg(long, default_value = "codex_index_commits.json")]
        commit_cache: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logger
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&cli.log_level)
    ).init();

    match cli.command {
        Commands::Index {
            root,
            dry_run,
            summary_json,
            commit_cache,
            skip_repo,
            agent_timeout,
            workers,
            agent_bin,
            prompt_file,
            worktree_root,
            keep_alive_secs,
        } => {
            cmd_index(IndexArgs {
                root,
                dry_run,
                summary_json,
                commit_cache,
                skip_repo,
                agent_timeout,
                workers,
                agent_bin,
                prompt_file,
                worktree_root,
                keep_alive_secs,
            })?;
        }
        Commands::Stats { commit_cache } => {
            cmd_stats(commit_cache)?;
        }
    }

    Ok(())
}
