//! Repository exclusion matching

use std::path::{Path, MAIN_SEPARATOR};

use indexer_core::{clean_path, relative_slash_path};

/// Decides from user patterns whether a repository is bypassed
///
/// A pattern matches, case-insensitively, the collection slug, the
/// directory name, the path relative to the scan root (with or without a
/// leading `./`), the absolute path, or the absolute path a relative pattern
/// resolves to under the scan root.
#[derive(Debug, Clone, Default)]
pub struct SkipMatcher {
    patterns: Vec<String>,
}

impl SkipMatcher {
    /// Blank patterns are dropped; the others are kept verbatim for reporting
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.trim().is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns the skip reason for the first matching pattern
    pub fn should_skip(&self, root_dir: &Path, repo_dir: &Path, slug: &str) -> Option<String> {
        if self.patterns.is_empty() {
            return None;
        }

        let repo_abs = clean_path(repo_dir);
        let repo_abs_lower = repo_abs.to_string_lossy().to_lowercase();
        let base_lower = repo_abs
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let rel_lower = relative_slash_path(root_dir, &repo_abs).to_lowercase();
        let slug_lower = slug.to_lowercase();

        self.patterns
            .iter()
            .find(|raw| {
                let pattern = raw.trim();
                let lower = pattern.to_lowercase();
                if lower == slug_lower || lower == base_lower || lower == rel_lower {
                    return true;
                }

                let cleaned = clean_path(Path::new(pattern));
                let cleaned_lower = cleaned.to_string_lossy().to_lowercase();
                if cleaned_lower == repo_abs_lower || to_slash(&cleaned_lower) == rel_lower {
                    return true;
                }

                if !cleaned.is_absolute() {
                    let resolved = clean_path(&root_dir.join(&cleaned));
                    if resolved.to_string_lossy().to_lowercase() == repo_abs_lower {
                        return true;
                    }
                }
                false
            })
            .map(|raw| format!("repo excluded via --skip-repo {:?}", raw))
    }
}

fn to_slash(path: &str) -> String {
    if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    }
}
