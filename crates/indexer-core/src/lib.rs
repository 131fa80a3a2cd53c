//! Indexer Core - Shared data models for the repository indexer
//!
//! This crate defines the per-repository result record and the pure naming
//! helpers (collection slugs, sanitized path components) shared by the
//! engine and the CLI.

mod models;
mod paths;
mod slug;

pub use models::{RepoResult, RepoStatus};
pub use paths::{clean_path, relative_components, relative_slash_path};
pub use slug::{
    compute_collection_slug, is_safe_char, sanitize_path_component, short_commit, ROOT_SLUG,
    SHORT_COMMIT_LEN,
};
