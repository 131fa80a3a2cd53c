//! Core data models for the indexer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Per-repository outcome of one indexing run
///
/// Created empty when a job starts and filled in as the pipeline stages
/// complete. Once a worker hands it to the scheduler it is never touched again.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoResult {
    /// Absolute path of the repository root
    pub path: PathBuf,

    /// Collection identity derived from the path relative to the scan root
    pub collection_slug: String,

    /// Branch the repository was indexed on (default branch, or current branch as fallback)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    /// Whether the isolated snapshot was created (`None` when isolation was not attempted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_ok: Option<bool>,

    /// Whether fetching the remote tip succeeded (`None` when isolation was not attempted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_ok: Option<bool>,

    /// Revision that was (or would have been) indexed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_commit: Option<String>,

    /// Revision recorded in the commit cache before this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_commit: Option<String>,

    /// Base revision of the incremental change set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_base_commit: Option<String>,

    /// Number of files in the change set
    #[serde(default, skip_serializing_if = "is_zero")]
    pub diff_file_count: usize,

    /// Whether the agent process was started
    pub codex_ran: bool,

    /// Exit code of a failed or timed out agent run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_exit_code: Option<i32>,

    /// Accumulated error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Why the repository was not indexed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    pub dry_run: bool,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Overall health of a repository result, as shown in the summary tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoStatus {
    Ok,
    Warn,
    Error,
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepoStatus::Ok => "ok",
            RepoStatus::Warn => "warn",
            RepoStatus::Error => "error",
        };
        f.write_str(s)
    }
}

impl RepoResult {
    /// Creates an empty result for a job that is about to start
    pub fn new(path: PathBuf, collection_slug: String, dry_run: bool) -> Self {
        Self {
            path,
            collection_slug,
            dry_run,
            ..Self::default()
        }
    }

    /// Last path component of the repository, used as the short display name
    pub fn repo_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }

    /// True when checkout or fetch was attempted and reported failure
    pub fn sync_failed(&self) -> bool {
        self.checkout_ok == Some(false) || self.pull_ok == Some(false)
    }

    /// Classifies the result for the summary tally
    ///
    /// An error text or a captured agent exit code is an error; a failed
    /// sync step is only a warning because indexing fell back to the
    /// working tree.
    pub fn status(&self) -> RepoStatus {
        if self.error.is_some() || (self.codex_ran && self.codex_exit_code.is_some()) {
            RepoStatus::Error
        } else if self.sync_failed() {
            RepoStatus::Warn
        } else {
            RepoStatus::Ok
        }
    }

    /// Git column text: the branch plus any sync failure annotations
    pub fn git_status(&self) -> String {
        let Some(branch) = self.default_branch.as_deref() else {
            return "unknown".to_string();
        };

        let mut parts = vec![branch.to_string()];
        if self.checkout_ok == Some(false) {
            parts.push("checkout failed".to_string());
        }
        if self.pull_ok == Some(false) {
            parts.push("pull failed".to_string());
        }
        parts.join(", ")
    }

    /// Agent column text
    pub fn codex_status(&self) -> String {
        if self.is_skipped() {
            "skipped".to_string()
        } else if self.dry_run {
            "dry-run".to_string()
        } else if !self.codex_ran {
            "not run".to_string()
        } else {
            match self.codex_exit_code {
                None => "ok".to_string(),
                Some(code) => format!("exit {}", code),
            }
        }
    }
}
