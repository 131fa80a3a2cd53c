//! Git collaborator
//!
//! Every repository operation goes through the `git` binary so the user's
//! credentials, config and hooks apply exactly as on the command line.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::error::GitError;

/// Remote whose branches are fetched and snapshotted
pub const DEFAULT_REMOTE: &str = "origin";

/// Thin wrapper over `git -C <dir> ...`
#[derive(Debug, Clone)]
pub struct Git {
    program: OsString,
}

impl Default for Git {
    fn default() -> Self {
        Self {
            program: OsString::from("git"),
        }
    }
}

impl Git {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific git executable instead of the one on `PATH`
    pub fn with_program<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs git in `dir` and returns its trimmed stdout
    fn run<I, S>(&self, dir: &Path, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command = self.describe(dir, &args);

        let started = Instant::now();
        log::debug!("Running {}", command);

        let output = Command::new(&self.program)
            .arg("-C")
            .arg(dir)
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        log::debug!(
            "{} finished with {} in {:.2}s",
            command,
            output.status,
            started.elapsed().as_secs_f64()
        );

        if !output.status.success() {
            return Err(GitError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn describe(&self, dir: &Path, args: &[OsString]) -> String {
        let mut parts = vec![
            self.program.to_string_lossy().into_owned(),
            "-C".to_string(),
            dir.display().to_string(),
        ];
        parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    /// Resolves the branch a fresh clone would check out
    ///
    /// Probes `origin/HEAD`, then a local `main`, then a local `master`.
    /// A probe that runs and fails just moves on; `Ok(None)` means no probe
    /// matched. Only a git binary that cannot be started is an error.
    pub fn default_branch(&self, repo: &Path) -> Result<Option<String>, GitError> {
        let origin_head = format!("refs/remotes/{}/HEAD", DEFAULT_REMOTE);
        match self.run(repo, ["symbolic-ref", "--quiet", "--short", origin_head.as_str()]) {
            Ok(out) => {
                let prefix = format!("{}/", DEFAULT_REMOTE);
                let branch = out.strip_prefix(&prefix).unwrap_or(&out).to_string();
                if !branch.is_empty() {
                    return Ok(Some(branch));
                }
            }
            Err(GitError::Failed { .. }) => {}
            Err(e) => return Err(e),
        }

        for candidate in ["main", "master"] {
            let reference = format!("refs/heads/{}", candidate);
            match self.run(repo, ["show-ref", "--verify", "--quiet", reference.as_str()]) {
                Ok(_) => return Ok(Some(candidate.to_string())),
                Err(GitError::Failed { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// `git fetch --prune <remote> <branch>`
    pub fn fetch_branch(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(repo, ["fetch", "--prune", remote, branch])?;
        Ok(())
    }

    /// Checks out `revision` detached into a new linked worktree at `path`
    pub fn add_detached_worktree(
        &self,
        repo: &Path,
        path: &Path,
        revision: &str,
    ) -> Result<(), GitError> {
        self.run(
            repo,
            [
                OsStr::new("worktree"),
                OsStr::new("add"),
                OsStr::new("--force"),
                OsStr::new("--detach"),
                path.as_os_str(),
                OsStr::new(revision),
            ],
        )?;
        Ok(())
    }

    /// Unregisters the linked worktree at `path` and deletes its checkout
    pub fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<(), GitError> {
        self.run(
            repo,
            [
                OsStr::new("worktree"),
                OsStr::new("remove"),
                OsStr::new("--force"),
                path.as_os_str(),
            ],
        )?;
        Ok(())
    }

    /// Full revision id of `HEAD`
    pub fn head_commit(&self, dir: &Path) -> Result<String, GitError> {
        self.run(dir, ["rev-parse", "HEAD"])
    }

    /// Short name of the checked-out branch (`HEAD` when detached)
    pub fn current_branch(&self, dir: &Path) -> Result<String, GitError> {
        self.run(dir, ["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Raw `git diff --name-only <base> HEAD` output
    pub fn diff_name_only(&self, dir: &Path, base: &str) -> Result<String, GitError> {
        self.run(dir, ["diff", "--name-only", base, "HEAD"])
    }
}
