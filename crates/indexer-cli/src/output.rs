//! Output formatting structures for CLI display

use indexer_core::{short_commit, RepoResult, RepoStatus};
use indexer_db::CacheEntry;
use tabled::settings::object::{Cell, Rows};
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

/// Column of the status cell in [`SummaryRow`]
const STATUS_COLUMN: usize = 5;

/// Table row of the end-of-run summary
#[derive(Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "Repo")]
    pub repo: String,
    #[tabled(rename = "Collection")]
    pub collection: String,
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[tabled(rename = "Git")]
    pub git: String,
    #[tabled(rename = "Codex")]
    pub codex: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&RepoResult> for SummaryRow {
    fn from(result: &RepoResult) -> Self {
        Self {
            repo: result.repo_name(),
            collection: result.collection_slug.clone(),
            branch: result.default_branch.clone().unwrap_or_else(|| "-".to_string()),
            git: result.git_status(),
            codex: result.codex_status(),
            status: result.status().to_string(),
        }
    }
}

/// Table row for displaying commit cache entries
#[derive(Tabled)]
pub struct CacheRow {
    #[tabled(rename = "Collection")]
    pub collection: String,
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[tabled(rename = "Commit")]
    pub commit: String,
}

fn colors_enabled() -> bool {
    colored::control::SHOULD_COLORIZE.should_colorize()
}

/// Renders the summary table, one row per result
pub fn render_summary(results: &[RepoResult]) -> String {
    let rows: Vec<SummaryRow> = results.iter().map(SummaryRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    if colors_enabled() {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
        for (i, result) in results.iter().enumerate() {
            let color = match result.status() {
                RepoStatus::Ok => Color::FG_GREEN,
                RepoStatus::Warn => Color::FG_YELLOW,
                RepoStatus::Error => Color::FG_RED,
            };
            table.with(Modify::new(Cell::new(i + 1, STATUS_COLUMN)).with(color));
        }
    }

    table.to_string()
}

/// Renders cached (collection, branch, commit) triples
pub fn render_cache_entries(entries: &[CacheEntry]) -> String {
    let rows: Vec<CacheRow> = entries
        .iter()
        .map(|entry| CacheRow {
            collection: entry.collection.clone(),
            branch: entry.branch.clone(),
            commit: short_commit(&entry.commit).to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    if colors_enabled() {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    }
    table.to_string()
}
