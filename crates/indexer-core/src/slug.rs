//! Collection slugs and filesystem-safe names

use std::path::Path;

use crate::paths::relative_components;

/// Slug of a repository that is the scan root itself
pub const ROOT_SLUG: &str = "root";

/// Separator used when flattening a relative path into a slug
pub const SLUG_SEPARATOR: &str = "_";

/// Sanitized value for empty input
pub const EMPTY_COMPONENT: &str = "default";

/// Sanitized value for input made entirely of replaced characters
pub const FALLBACK_COMPONENT: &str = "component";

/// Length of abbreviated revisions in progress output
pub const SHORT_COMMIT_LEN: usize = 7;

/// Derives the collection slug of `repo_dir` relative to `root_dir`
///
/// Path components are joined with `_`; the scan root itself maps to
/// [`ROOT_SLUG`]. Example: `<root>/services/api` becomes `services_api`.
pub fn compute_collection_slug(root_dir: &Path, repo_dir: &Path) -> String {
    let rel = relative_components(root_dir, repo_dir);
    if rel.is_empty() {
        return ROOT_SLUG.to_string();
    }
    rel.join(SLUG_SEPARATOR)
}

/// Makes `value` usable as a single path component
///
/// Letters, decimal digits, `-`, `_` and `.` are kept, everything else
/// becomes `_`. The output is never empty.
pub fn sanitize_path_component(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return EMPTY_COMPONENT.to_string();
    }

    let out: String = value
        .chars()
        .map(|c| {
            if is_safe_char(c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    if out.trim_matches('_').is_empty() {
        return FALLBACK_COMPONENT.to_string();
    }
    out
}

/// Whether `c` survives [`sanitize_path_component`]
///
/// Letter-like numerics (`Ⅻ`) and non-decimal numerics (`²`, `½`) are
/// replaced. Only ASCII decimal digits are kept.
pub fn is_safe_char(c: char) -> bool {
    (c.is_alphabetic() && !c.is_numeric()) || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
}

/// First [`SHORT_COMMIT_LEN`] characters of a revision
pub fn short_commit(commit: &str) -> &str {
    commit.get(..SHORT_COMMIT_LEN).unwrap_or(commit)
}
