//! Isolated workspaces
//!
//! A repository with a known branch is indexed from a detached linked
//! worktree of `origin/<branch>` under a scratch directory, so the user's own
//! checkout is never touched. Any failing step falls back to indexing the
//! repository in place.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexer_core::sanitize_path_component;

use crate::git::{Git, DEFAULT_REMOTE};
use crate::output::Console;

/// Directory under the system temp dir holding all scratch worktrees
pub const WORKTREE_ROOT_DIR_NAME: &str = "codex-indexer-worktrees";

/// Joins slug and branch in a scratch directory name
///
/// Sanitizing never leaves this character in either part, so distinct
/// (slug, branch) pairs always get distinct directories.
pub const SCRATCH_SEPARATOR: char = '@';

pub fn default_worktree_root() -> PathBuf {
    env::temp_dir().join(WORKTREE_ROOT_DIR_NAME)
}

/// Creates and names scratch worktrees
#[derive(Debug, Clone)]
pub struct WorkspaceIsolator {
    git: Git,
    root: PathBuf,
}

impl WorkspaceIsolator {
    pub fn new(git: Git, root: PathBuf) -> Self {
        Self { git, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory for one (collection, branch) pair
    pub fn scratch_path(&self, slug: &str, branch: &str) -> PathBuf {
        self.root.join(format!(
            "{}{}{}",
            sanitize_path_component(slug),
            SCRATCH_SEPARATOR,
            sanitize_path_component(branch)
        ))
    }

    /// Prepares the directory the agent will run in
    ///
    /// The returned workspace owns the scratch worktree, if one was created,
    /// and removes it on [`PreparedWorkspace::release`] or drop.
    pub fn prepare(
        &self,
        console: &Console,
        repo_dir: &Path,
        slug: &str,
        branch: Option<&str>,
        dry_run: bool,
    ) -> PreparedWorkspace {
        let Some(branch) = branch.filter(|b| !b.is_empty()) else {
            return PreparedWorkspace::in_place(repo_dir, None, None);
        };

        let scratch = self.scratch_path(slug, branch);
        let upstream = format!("{}/{}", DEFAULT_REMOTE, branch);

        if dry_run {
            console.info(format!(
                "[dry-run] git -C {:?} fetch --prune {} {}",
                repo_dir, DEFAULT_REMOTE, branch
            ));
            console.info(format!(
                "[dry-run] git -C {:?} worktree add --force --detach {:?} {}",
                repo_dir, scratch, upstream
            ));
            return PreparedWorkspace::in_place(repo_dir, None, None);
        }

        remove_stale(&scratch);

        if let Err(e) = fs::create_dir_all(&self.root) {
            console.warn(format!(
                "create worktree root {:?} failed ({}); indexing working tree in place",
                self.root, e
            ));
            return PreparedWorkspace::in_place(repo_dir, Some(false), Some(false));
        }

        console.info(format!("fetching {} from {}", branch, DEFAULT_REMOTE));
        if let Err(e) = self.git.fetch_branch(repo_dir, DEFAULT_REMOTE, branch) {
            console.warn(format!("fetch failed ({}); indexing working tree in place", e));
            return PreparedWorkspace::in_place(repo_dir, Some(false), Some(false));
        }

        if let Err(e) = self.git.add_detached_worktree(repo_dir, &scratch, &upstream) {
            console.warn(format!(
                "creating worktree for {} failed ({}); indexing working tree in place",
                upstream, e
            ));
            return PreparedWorkspace::in_place(repo_dir, Some(false), Some(true));
        }

        console.info(format!("using isolated worktree {}", scratch.display()));
        PreparedWorkspace {
            path: scratch.clone(),
            checkout_ok: Some(true),
            pull_ok: Some(true),
            worktree: Some(IsolatedWorktree {
                git: self.git.clone(),
                repo_dir: repo_dir.to_path_buf(),
                path: scratch,
                console: console.clone(),
            }),
        }
    }
}

fn remove_stale(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => log::debug!("Removed stale worktree {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove stale worktree {:?}: {}", path, e),
    }
}

/// Where the agent runs, plus the sync outcome of getting there
#[derive(Debug)]
pub struct PreparedWorkspace {
    pub path: PathBuf,
    /// `None` when no checkout was attempted
    pub checkout_ok: Option<bool>,
    /// `None` when no fetch was attempted
    pub pull_ok: Option<bool>,
    worktree: Option<IsolatedWorktree>,
}

impl PreparedWorkspace {
    fn in_place(repo_dir: &Path, checkout_ok: Option<bool>, pull_ok: Option<bool>) -> Self {
        Self {
            path: repo_dir.to_path_buf(),
            checkout_ok,
            pull_ok,
            worktree: None,
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.worktree.is_some()
    }

    /// Removes the scratch worktree now instead of at drop
    pub fn release(self) {
        drop(self);
    }
}

/// Registration and checkout of one scratch worktree; removed on drop
#[derive(Debug)]
struct IsolatedWorktree {
    git: Git,
    repo_dir: PathBuf,
    path: PathBuf,
    console: Console,
}

impl Drop for IsolatedWorktree {
    fn drop(&mut self) {
        if let Err(e) = self.git.remove_worktree(&self.repo_dir, &self.path) {
            self.console
                .warn(format!("cleanup worktree {}: {}", self.path.display(), e));
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => self
                .console
                .warn(format!("remove worktree dir {}: {}", self.path.display(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_path_sanitizes_both_parts() {
        let isolator = WorkspaceIsolator::new(Git::new(), PathBuf::from("/tmp/wt"));
        assert_eq!(
            isolator.scratch_path("team_api", "feature/login"),
            PathBuf::from("/tmp/wt/team_api@feature_login")
        );
    }

    #[test]
    fn test_scratch_paths_do_not_collide() {
        let isolator = WorkspaceIsolator::new(Git::new(), PathBuf::from("/tmp/wt"));
        assert_ne!(
            isolator.scratch_path("a-b", "c"),
            isolator.scratch_path("a", "b-c")
        );
        assert_ne!(
            isolator.scratch_path("a@b", "c"),
            isolator.scratch_path("a", "b@c")
        );
    }

    #[test]
    fn test_no_branch_uses_repo_in_place() {
        let isolator = WorkspaceIsolator::new(Git::with_program("/nonexistent/git"), PathBuf::from("/tmp/wt"));
        let ws = isolator.prepare(&Console::sink(), Path::new("/repo"), "repo", None, false);
        assert_eq!(ws.path, PathBuf::from("/repo"));
        assert_eq!(ws.checkout_ok, None);
        assert_eq!(ws.pull_ok, None);
        assert!(!ws.is_isolated());
    }
}
