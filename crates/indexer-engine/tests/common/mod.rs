//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use anyhow::{bail, Result};
use git2::{Repository, RepositoryInitOptions, Signature};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

/// Branch name used by fixture repositories that must not look like a default branch
pub const LOCAL_BRANCH: &str = "trunk";

/// Creates a repository on `branch` with one commit; returns the commit id
pub fn init_repo_on(dir: &Path, branch: &str) -> Result<String> {
    fs::create_dir_all(dir)?;
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head(branch);
    Repository::init_opts(dir, &opts)?;
    commit_file(dir, "README.md", "# fixture\n", "initial commit")
}

/// Creates a repository on [`LOCAL_BRANCH`] with one commit
pub fn init_repo(dir: &Path) -> Result<String> {
    init_repo_on(dir, LOCAL_BRANCH)
}

/// Writes `name` and commits it on the current branch; returns the commit id
pub fn commit_file(repo_dir: &Path, name: &str, content: &str, message: &str) -> Result<String> {
    let repo = Repository::open(repo_dir)?;
    let file = repo_dir.join(name);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file, content)?;

    let mut index = repo.index()?;
    index.add_path(Path::new(name))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let sig = Signature::now("Indexer Tests", "tests@example.com")?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
    Ok(oid.to_string())
}

pub fn head_of(repo_dir: &Path) -> Result<String> {
    let repo = Repository::open(repo_dir)?;
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Runs the git CLI and fails on a non-zero exit
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").arg("-C").arg(dir).args(args).output()?;
    if !output.status.success() {
        bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Clones `upstream` into `dest` with the git CLI, so `origin/HEAD` is set
pub fn clone_repo(upstream: &Path, dest: &Path) -> Result<()> {
    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(upstream)
        .arg(dest)
        .output()?;
    if !output.status.success() {
        bail!("git clone failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}

/// Writes an executable `/bin/sh` script standing in for the agent
pub fn write_agent_stub(dir: &Path, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join("codex-stub.sh");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Clonable in-memory console sink
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
