//! Indexer Engine - Orchestration of repository indexing runs
//!
//! This crate is responsible for:
//! - Discovering git repositories under a scan root
//! - Preparing isolated worktrees of each repository's default branch
//! - Computing incremental change sets against the commit cache
//! - Running the Codex agent with a timeout and a keep-alive stdin
//! - Fanning jobs out over a bounded worker pool, keeping input order

mod agent;
mod changes;
mod discovery;
mod error;
mod feeder;
mod formatting;
mod git;
mod indexer;
mod output;
mod pipeline;
mod prompt;
mod scheduler;
mod skip;
mod stats;
mod workspace;

pub use agent::{
    agent_env, AgentConfig, AgentInvoker, AgentJob, AgentOutcome, DEFAULT_AGENT_PROGRAM,
    DEFAULT_KEEP_ALIVE_INTERVAL, ENV_BASE_COMMIT, ENV_COLLECTION_SLUG, ENV_DIFF_FILES,
};
pub use changes::{diff_since, parse_name_list};
pub use discovery::find_git_repos;
pub use error::{ChangeSetError, DiscoveryError, GitError};
pub use feeder::{CloseGuard, FeederCloser, NewlineFeeder};
pub use formatting::format_duration;
pub use git::{Git, DEFAULT_REMOTE};
pub use indexer::{Indexer, IndexerConfig};
pub use output::{Console, LockedWriter};
pub use prompt::DEFAULT_PROMPT;
pub use scheduler::effective_workers;
pub use skip::SkipMatcher;
pub use stats::RunStats;
pub use workspace::{
    default_worktree_root, PreparedWorkspace, WorkspaceIsolator, SCRATCH_SEPARATOR,
    WORKTREE_ROOT_DIR_NAME,
};
