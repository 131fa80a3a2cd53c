//! End-to-end tests for the per-repository pipeline and the worker pool

#![cfg(unix)]

mod common;

use anyhow::Result;
use common::{
    clone_repo, commit_file, git, init_repo, init_repo_on, write_agent_stub, SharedBuffer, LOCAL_BRANCH,
};
use indexer_db::CommitCache;
use indexer_engine::{AgentConfig, Console, Indexer, IndexerConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

// ── fixtures ─────────────────────────────────────────────────────────────────

const OK_STUB: &str = "echo \"indexing $COLLECTION_SLUG\"\nexit 0";

struct Fixture {
    tmp: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Result<Self> {
        let tmp = TempDir::new()?;
        let root = tmp.path().join("code");
        std::fs::create_dir_all(&root)?;
        Ok(Self { tmp, root })
    }

    fn repo(&self, rel: &str) -> Result<(PathBuf, String)> {
        let dir = self.root.join(rel);
        let head = init_repo(&dir)?;
        Ok((dir, head))
    }

    fn stub(&self, body: &str) -> Result<PathBuf> {
        write_agent_stub(&self.tmp.path().join("bin"), body)
    }

    fn config(&self, program: &Path) -> IndexerConfig {
        IndexerConfig {
            agent: AgentConfig {
                program: program.to_path_buf(),
                ..AgentConfig::default()
            }
            .with_timeout(Duration::from_secs(30)),
            worktree_root: self.tmp.path().join("worktrees"),
            ..IndexerConfig::default()
        }
    }
}

// ── scenarios ────────────────────────────────────────────────────────────────

#[test]
fn test_two_repos_two_workers_update_cache() -> Result<()> {
    let fx = Fixture::new()?;
    let (alpha, alpha_head) = fx.repo("alpha")?;
    let (beta, beta_head) = fx.repo("team/beta")?;
    let stub = fx.stub(OK_STUB)?;
    let cache = CommitCache::in_memory();

    let config = IndexerConfig {
        workers: 2,
        ..fx.config(&stub)
    };
    let indexer = Indexer::new(config, &cache, Console::sink());
    let results = indexer.run_all(&[alpha.clone(), beta.clone()], &fx.root);

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.codex_ran, "{:?}", result);
        assert_eq!(result.codex_exit_code, None);
        assert_eq!(result.error, None);
        assert_eq!(result.default_branch.as_deref(), Some(LOCAL_BRANCH));
    }
    assert_eq!(results[0].path, alpha);
    assert_eq!(results[0].collection_slug, "alpha");
    assert_eq!(results[1].collection_slug, "team_beta");

    assert_eq!(cache.lookup("alpha", LOCAL_BRANCH), Some(alpha_head));
    assert_eq!(cache.lookup("team_beta", LOCAL_BRANCH), Some(beta_head));
    assert_eq!(cache.entry_count(), 2);
    Ok(())
}

#[test]
fn test_cached_head_is_skipped() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, head) = fx.repo("alpha")?;
    let marker = fx.tmp.path().join("agent-ran");
    let stub = fx.stub(&format!("touch {:?}", marker))?;
    let cache = CommitCache::in_memory();
    cache.update("alpha", LOCAL_BRANCH, &head);

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::sink());
    let result = indexer.process_repo(&fx.root, &repo);

    let reason = result.skip_reason.clone().unwrap_or_default();
    assert!(!reason.is_empty());
    assert!(reason.contains("already indexed"));
    assert!(!result.codex_ran);
    assert!(!marker.exists());
    assert_eq!(cache.lookup("alpha", LOCAL_BRANCH), Some(head));
    assert_eq!(cache.entry_count(), 1);
    Ok(())
}

#[test]
fn test_timeout_is_recorded_as_deadline() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, _) = fx.repo("slow")?;
    let stub = fx.stub("exec sleep 5")?;
    let cache = CommitCache::in_memory();

    let mut config = fx.config(&stub);
    config.agent.timeout = Some(Duration::from_millis(300));
    let indexer = Indexer::new(config, &cache, Console::sink());
    let result = indexer.process_repo(&fx.root, &repo);

    assert!(result.codex_ran);
    assert!(result.codex_exit_code.is_some());
    assert!(result.error.as_deref().unwrap_or("").contains("deadline exceeded"));
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn test_failed_agent_leaves_cache_untouched() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, _) = fx.repo("broken")?;
    let stub = fx.stub("exit 2")?;
    let cache = CommitCache::in_memory();

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::sink());
    let result = indexer.process_repo(&fx.root, &repo);

    assert!(result.codex_ran);
    assert_eq!(result.codex_exit_code, Some(2));
    let error = result.error.unwrap_or_default();
    assert!(error.starts_with("codex exec:"));
    assert!(!error.contains("deadline"));
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn test_results_keep_input_order() -> Result<()> {
    let fx = Fixture::new()?;
    let mut repos = Vec::new();
    for name in ["e", "d", "c", "b", "a"] {
        repos.push(fx.repo(name)?.0);
    }
    // Reverse-ordered sleeps so later repositories tend to finish first
    let stub = fx.stub(
        "case \"$COLLECTION_SLUG\" in e) sleep 0.4;; d) sleep 0.3;; c) sleep 0.2;; b) sleep 0.1;; esac\nexit 0",
    )?;
    let cache = CommitCache::in_memory();

    let config = IndexerConfig {
        workers: 3,
        ..fx.config(&stub)
    };
    let indexer = Indexer::new(config, &cache, Console::sink());
    let results = indexer.run_all(&repos, &fx.root);

    let paths: Vec<&PathBuf> = results.iter().map(|r| &r.path).collect();
    assert_eq!(paths, repos.iter().collect::<Vec<_>>());
    assert!(results.iter().all(|r| r.codex_ran && r.error.is_none()));
    Ok(())
}

#[test]
fn test_parallel_output_lines_stay_whole() -> Result<()> {
    let fx = Fixture::new()?;
    let mut repos = Vec::new();
    for name in ["one", "two", "three", "four"] {
        repos.push(fx.repo(name)?.0);
    }
    let stub = fx.stub("i=0\nwhile [ $i -lt 20 ]; do echo \"line-$COLLECTION_SLUG-$i-end\"; i=$((i+1)); done")?;
    let cache = CommitCache::in_memory();
    let out = SharedBuffer::default();

    let config = IndexerConfig {
        workers: 4,
        ..fx.config(&stub)
    };
    let indexer = Indexer::new(config, &cache, Console::new(out.clone(), std::io::sink()));
    indexer.run_all(&repos, &fx.root);

    let text = out.text();
    let agent_lines: Vec<&str> = text.lines().filter(|l| l.contains("line-")).collect();
    assert_eq!(agent_lines.len(), 80);
    for line in agent_lines {
        assert!(line.starts_with("line-") && line.ends_with("-end"), "torn line: {line}");
    }
    Ok(())
}

// ── incremental runs ─────────────────────────────────────────────────────────

#[test]
fn test_changed_files_since_cached_commit() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, old_head) = fx.repo("alpha")?;
    let new_head = commit_file(&repo, "src/main.rs", "fn main() {}\n", "add main")?;
    let stub = fx.stub("echo \"base=$INDEX_BASE_COMMIT\"\necho \"files=$INDEX_DIFF_FILES\"")?;
    let cache = CommitCache::in_memory();
    cache.update("alpha", LOCAL_BRANCH, &old_head);
    let out = SharedBuffer::default();

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::new(out.clone(), std::io::sink()));
    let result = indexer.process_repo(&fx.root, &repo);

    assert_eq!(result.cached_commit.as_deref(), Some(old_head.as_str()));
    assert_eq!(result.diff_base_commit.as_deref(), Some(old_head.as_str()));
    assert_eq!(result.diff_file_count, 1);
    assert_eq!(result.indexed_commit.as_deref(), Some(new_head.as_str()));
    let text = out.text();
    assert!(text.contains(&format!("base={}", old_head)));
    assert!(text.contains("files=src/main.rs"));
    assert_eq!(cache.lookup("alpha", LOCAL_BRANCH), Some(new_head));
    Ok(())
}

#[test]
fn test_unreachable_base_falls_back_to_full_run() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, head) = fx.repo("alpha")?;
    let stub = fx.stub("echo \"base=[${INDEX_BASE_COMMIT-unset}]\"")?;
    let cache = CommitCache::in_memory();
    cache.update("alpha", LOCAL_BRANCH, "0123456789abcdef0123456789abcdef01234567");
    let out = SharedBuffer::default();

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::new(out.clone(), std::io::sink()));
    let result = indexer.process_repo(&fx.root, &repo);

    assert!(result.codex_ran);
    assert_eq!(result.error, None);
    assert_eq!(result.diff_base_commit, None);
    assert_eq!(result.diff_file_count, 0);
    let text = out.text();
    assert!(text.contains("falling back to full indexing"));
    assert!(text.contains("base=[unset]"));
    assert_eq!(cache.lookup("alpha", LOCAL_BRANCH), Some(head));
    Ok(())
}

// ── skips and dry runs ───────────────────────────────────────────────────────

#[test]
fn test_skip_pattern_short_circuits() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, _) = fx.repo("services/api")?;
    let marker = fx.tmp.path().join("agent-ran");
    let stub = fx.stub(&format!("touch {:?}", marker))?;
    let cache = CommitCache::in_memory();

    let config = IndexerConfig {
        skip_patterns: vec!["./Services/API".to_string()],
        ..fx.config(&stub)
    };
    let indexer = Indexer::new(config, &cache, Console::sink());
    let result = indexer.process_repo(&fx.root, &repo);

    assert!(result.skip_reason.unwrap_or_default().contains("./Services/API"));
    assert!(!result.codex_ran);
    assert_eq!(result.default_branch, None);
    assert!(!marker.exists());
    Ok(())
}

#[test]
fn test_dry_run_never_runs_agent_or_caches() -> Result<()> {
    let fx = Fixture::new()?;
    let (repo, head) = fx.repo("alpha")?;
    let marker = fx.tmp.path().join("agent-ran");
    let stub = fx.stub(&format!("touch {:?}", marker))?;
    let cache = CommitCache::in_memory();

    let config = IndexerConfig {
        dry_run: true,
        ..fx.config(&stub)
    };
    let indexer = Indexer::new(config, &cache, Console::sink());
    let result = indexer.process_repo(&fx.root, &repo);

    assert!(result.dry_run);
    assert!(!result.codex_ran);
    assert_eq!(result.error, None);
    assert_eq!(result.indexed_commit, Some(head));
    assert!(!marker.exists());
    assert!(cache.is_empty());
    Ok(())
}

// ── isolation through the pipeline ───────────────────────────────────────────

#[test]
fn test_clone_is_indexed_from_isolated_worktree() -> Result<()> {
    let fx = Fixture::new()?;
    let upstream = fx.tmp.path().join("upstream");
    init_repo_on(&upstream, "main")?;
    let repo = fx.root.join("svc");
    clone_repo(&upstream, &repo)?;
    let remote_head = commit_file(&upstream, "NEW.md", "new\n", "upstream change")?;

    let stub = fx.stub("echo \"cwd=$(pwd -P)\"")?;
    let cache = CommitCache::in_memory();
    let out = SharedBuffer::default();

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::new(out.clone(), std::io::sink()));
    let result = indexer.process_repo(&fx.root, &repo);

    assert_eq!(result.default_branch.as_deref(), Some("main"));
    assert_eq!(result.checkout_ok, Some(true));
    assert_eq!(result.pull_ok, Some(true));
    assert_eq!(result.indexed_commit.as_deref(), Some(remote_head.as_str()));
    assert!(out.text().contains("worktrees/svc@main"));
    assert!(!fx.tmp.path().join("worktrees/svc@main").exists());
    assert_eq!(cache.lookup("svc", "main"), Some(remote_head));
    Ok(())
}

/// Clone of a `main` upstream at `<root>/svc`
fn cloned_service(fx: &Fixture) -> Result<PathBuf> {
    let upstream = fx.tmp.path().join("upstream");
    init_repo_on(&upstream, "main")?;
    let repo = fx.root.join("svc");
    clone_repo(&upstream, &repo)?;
    Ok(repo)
}

fn assert_scratch_removed(fx: &Fixture, repo: &Path) -> Result<()> {
    assert!(!fx.tmp.path().join("worktrees/svc@main").exists());
    let listed = git(repo, &["worktree", "list", "--porcelain"])?;
    assert!(!listed.contains("svc@main"), "worktree still registered: {listed}");
    Ok(())
}

#[test]
fn test_failed_agent_still_removes_worktree() -> Result<()> {
    let fx = Fixture::new()?;
    let repo = cloned_service(&fx)?;
    let stub = fx.stub("echo \"cwd=$(pwd -P)\"\nexit 2")?;
    let cache = CommitCache::in_memory();
    let out = SharedBuffer::default();

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::new(out.clone(), std::io::sink()));
    let result = indexer.process_repo(&fx.root, &repo);

    assert_eq!(result.checkout_ok, Some(true));
    assert_eq!(result.codex_exit_code, Some(2));
    assert!(out.text().contains("worktrees/svc@main"));
    assert_scratch_removed(&fx, &repo)?;
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn test_timed_out_agent_still_removes_worktree() -> Result<()> {
    let fx = Fixture::new()?;
    let repo = cloned_service(&fx)?;
    let stub = fx.stub("echo \"cwd=$(pwd -P)\"\nsleep 10")?;
    let cache = CommitCache::in_memory();
    let out = SharedBuffer::default();

    let mut config = fx.config(&stub);
    config.agent.timeout = Some(Duration::from_millis(500));
    let indexer = Indexer::new(config, &cache, Console::new(out.clone(), std::io::sink()));
    let result = indexer.process_repo(&fx.root, &repo);

    assert_eq!(result.checkout_ok, Some(true));
    assert!(result.error.as_deref().unwrap_or("").contains("deadline exceeded"));
    assert!(out.text().contains("worktrees/svc@main"));
    assert_scratch_removed(&fx, &repo)?;
    assert!(cache.is_empty());
    Ok(())
}

// ── discovery ────────────────────────────────────────────────────────────────

#[test]
fn test_index_root_discovers_and_indexes() -> Result<()> {
    let fx = Fixture::new()?;
    fx.repo("b")?;
    fx.repo("a/nested")?;
    std::fs::create_dir_all(fx.root.join("not-a-repo"))?;
    let stub = fx.stub(OK_STUB)?;
    let cache = CommitCache::in_memory();

    let indexer = Indexer::new(fx.config(&stub), &cache, Console::sink());
    let results = indexer.index_root(&fx.root)?;

    let slugs: Vec<&str> = results.iter().map(|r| r.collection_slug.as_str()).collect();
    assert_eq!(slugs, vec!["a_nested", "b"]);
    Ok(())
}

#[test]
fn test_index_root_missing_directory_is_fatal() -> Result<()> {
    let fx = Fixture::new()?;
    let cache = CommitCache::in_memory();
    let indexer = Indexer::new(IndexerConfig::default(), &cache, Console::sink());
    assert!(indexer.index_root(&fx.root.join("missing")).is_err());
    Ok(())
}
