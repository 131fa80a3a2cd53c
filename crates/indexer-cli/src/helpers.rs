//! Helper functions for CLI operations

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use indexer_core::{clean_path, RepoResult};
use indexer_engine::DEFAULT_PROMPT;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON run report
#[derive(Serialize)]
pub struct Summary<'a> {
    pub generated_at: String,
    pub root_dir: &'a Path,
    pub dry_run: bool,
    pub repos: &'a [RepoResult],
}

/// Absolute, `.`/`..`-folded form of the scan root; it must be a directory
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let absolute = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(root)
    };
    let absolute = clean_path(&absolute);

    if !absolute.is_dir() {
        anyhow::bail!("Root directory {:?} does not exist or is not a directory", absolute);
    }
    Ok(absolute)
}

/// Flattens repeated and comma-separated `--skip-repo` values
pub fn split_skip_patterns(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect()
}

/// Built-in prompt, or the contents of `--prompt-file`
pub fn load_prompt(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(DEFAULT_PROMPT.to_string());
    };

    let prompt = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file {:?}", path))?;
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt file {:?} is empty", path);
    }
    Ok(prompt)
}

/// Writes the JSON summary atomically, readable by the owner only
pub fn write_summary_json(
    path: &Path,
    root_dir: &Path,
    dry_run: bool,
    results: &[RepoResult],
) -> Result<()> {
    let summary = Summary {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        root_dir,
        dry_run,
        repos: results,
    };
    let bytes = serde_json::to_vec_pretty(&summary).context("Failed to encode summary")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Temp files are created 0600
    let mut tmp = tempfile::Builder::new()
        .prefix(".codex-summary")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    tmp.write_all(&bytes)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move summary into place at {:?}", path))?;

    log::info!("Summary written to {:?}", path);
    Ok(())
}
