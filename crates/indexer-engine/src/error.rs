//! Error types for indexer-engine

use std::io;
use std::path::PathBuf;

/// Failure of a git invocation
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The git binary could not be started at all
    #[error("{command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// git ran and exited unsuccessfully
    #[error("{command}: {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Repository discovery failure; fatal for the whole run
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("walk repos in {root:?}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// Why no change set could be computed
#[derive(Debug, thiserror::Error)]
pub enum ChangeSetError {
    #[error("base commit is required to compute a diff")]
    MissingBase,

    #[error(transparent)]
    Git(#[from] GitError),
}
