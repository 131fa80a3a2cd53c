//! Per-repository pipeline
//!
//! skip check, default branch, workspace isolation, revision detection,
//! cache lookup, change set, agent run, cache update, cleanup.

use indexer_core::{compute_collection_slug, short_commit, RepoResult};
use std::path::Path;

use crate::agent::{AgentJob, AgentOutcome};
use crate::changes::diff_since;
use crate::indexer::Indexer;

/// Change set handed to an incremental agent run
struct ChangeSet<'a> {
    base: &'a str,
    files: Vec<String>,
}

impl Indexer<'_> {
    /// Runs the whole pipeline for one repository
    ///
    /// Never fails: every problem is logged and recorded on the result.
    pub fn process_repo(&self, root_dir: &Path, repo_dir: &Path) -> RepoResult {
        let slug = compute_collection_slug(root_dir, repo_dir);
        let mut result = RepoResult::new(repo_dir.to_path_buf(), slug.clone(), self.dry_run);
        self.console.repo_header(repo_dir, &slug);

        if let Some(reason) = self.skip.should_skip(root_dir, repo_dir, &slug) {
            self.console.info(format!("skipping: {}", reason));
            result.skip_reason = Some(reason);
            self.console.blank();
            return result;
        }

        let default_branch = self.report_default_branch(repo_dir);

        let workspace = self.isolator.prepare(
            &self.console,
            repo_dir,
            &slug,
            default_branch.as_deref(),
            self.dry_run,
        );
        result.checkout_ok = workspace.checkout_ok;
        result.pull_ok = workspace.pull_ok;

        let branch = default_branch.or_else(|| self.select_current_branch(&workspace.path));
        result.default_branch = branch.clone();

        let head = self.detect_indexed_commit(&workspace.path);
        result.indexed_commit = head.clone();

        let cached = branch
            .as_deref()
            .and_then(|branch| self.cache.lookup(&slug, branch));
        result.cached_commit = cached.clone();

        if let Some(reason) = already_indexed(cached.as_deref(), head.as_deref(), branch.as_deref()) {
            self.console.info(format!("skipping: {}", reason));
            result.skip_reason = Some(reason);
            workspace.release();
            self.console.blank();
            return result;
        }

        let change_set = cached.as_deref().and_then(|base| self.resolve_change_set(&workspace.path, base));
        if let Some(changes) = &change_set {
            result.diff_base_commit = Some(changes.base.to_string());
            result.diff_file_count = changes.files.len();
        }

        let job = AgentJob {
            workspace: &workspace.path,
            slug: &slug,
            base_commit: change_set.as_ref().map(|c| c.base),
            changed_files: change_set.as_ref().map(|c| c.files.as_slice()).unwrap_or(&[]),
            dry_run: self.dry_run,
        };
        let outcome = self.agent.run(&self.console, &job);
        record_outcome(&mut result, &outcome);

        if result.error.is_none() && !self.dry_run {
            if let (Some(branch), Some(head)) = (branch.as_deref(), head.as_deref()) {
                self.record_success(&slug, branch, head);
            }
        }

        workspace.release();
        self.console.blank();
        result
    }

    fn report_default_branch(&self, repo_dir: &Path) -> Option<String> {
        match self.git.default_branch(repo_dir) {
            Ok(Some(branch)) => {
                self.console.info(format!("default branch: {}", branch));
                Some(branch)
            }
            Ok(None) => {
                self.console
                    .warn("could not determine default branch; indexing current working tree");
                None
            }
            Err(e) => {
                self.console.warn(format!("default branch detection failed: {}", e));
                None
            }
        }
    }

    /// Checked-out branch, used when no default branch was found
    fn select_current_branch(&self, dir: &Path) -> Option<String> {
        match self.git.current_branch(dir) {
            Ok(branch) if !branch.is_empty() && branch != "HEAD" => Some(branch),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Current branch of {:?} unknown: {}", dir, e);
                None
            }
        }
    }

    fn detect_indexed_commit(&self, dir: &Path) -> Option<String> {
        match self.git.head_commit(dir) {
            Ok(commit) if !commit.is_empty() => Some(commit),
            Ok(_) => None,
            Err(e) => {
                self.console.warn(format!("could not resolve HEAD: {}", e));
                None
            }
        }
    }

    fn resolve_change_set<'b>(&self, workspace: &Path, base: &'b str) -> Option<ChangeSet<'b>> {
        match diff_since(&self.git, workspace, base) {
            Ok(files) => {
                self.console.info(format!(
                    "incremental run: {} file(s) changed since {}",
                    files.len(),
                    short_commit(base)
                ));
                Some(ChangeSet { base, files })
            }
            Err(e) => {
                self.console.warn(format!(
                    "diff against {} failed ({}); falling back to full indexing",
                    short_commit(base),
                    e
                ));
                None
            }
        }
    }

    fn record_success(&self, slug: &str, branch: &str, commit: &str) {
        self.cache.update(slug, branch, commit);
        if let Err(e) = self.cache.persist() {
            log::warn!("Saving commit cache after {} failed: {}", slug, e);
        }
    }
}

/// Skip reason when the cached revision already equals `HEAD`
fn already_indexed(cached: Option<&str>, head: Option<&str>, branch: Option<&str>) -> Option<String> {
    match (cached, head, branch) {
        (Some(cached), Some(head), Some(branch)) if cached == head => Some(format!(
            "commit {} on {} already indexed",
            short_commit(head),
            branch
        )),
        _ => None,
    }
}

fn record_outcome(result: &mut RepoResult, outcome: &AgentOutcome) {
    result.codex_ran = outcome.ran();
    result.codex_exit_code = outcome.exit_code();
    if let Some(message) = outcome.error_message() {
        result.error = Some(match result.error.take() {
            Some(previous) => format!("{}; {}", previous, message),
            None => message,
        });
    }
}
