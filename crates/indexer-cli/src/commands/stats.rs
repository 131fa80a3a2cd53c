//! Stats command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use indexer_db::CommitCache;
use std::path::PathBuf;

use crate::output::render_cache_entries;

/// Displays commit cache statistics
pub fn cmd_stats(path: PathBuf) -> Result<()> {
    let cache = CommitCache::open(&path)
        .with_context(|| format!("Failed to load commit cache {:?}", path))?;

    println!("{}", "Commit Cache Statistics:".bright_cyan().bold());
    println!("  {}: {}", "File".bright_yellow(), path.display());
    println!("  {}: {}", "Collections".bright_yellow(), cache.collection_count().to_string().bold());
    println!("  {}: {}", "Branches".bright_yellow(), cache.entry_count().to_string().bold());

    if cache.is_empty() {
        println!("\n  {}", "No repositories indexed yet".dimmed());
        return Ok(());
    }

    println!();
    println!("{}", render_cache_entries(&cache.entries()));
    Ok(())
}
