//! Repository discovery

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::DiscoveryError;

const GIT_DIR_NAME: &str = ".git";

/// Finds every directory under `root` that contains a `.git` directory
///
/// Entries are visited in file-name order, so the result is deterministic.
/// Ignore files and hidden-entry rules are not applied, symlinks are not
/// followed and `.git` directories are not descended into. Nested
/// repositories are reported alongside their parents.
pub fn find_git_repos(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| entry.depth() == 0 || !inside_git_dir(entry.path()))
        .build();

    let mut repos = Vec::new();
    for result in walker {
        let entry = result.map_err(|source| DiscoveryError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if entry.depth() > 0 && is_dir && entry.file_name() == GIT_DIR_NAME {
            if let Some(parent) = entry.path().parent() {
                repos.push(parent.to_path_buf());
            }
        }
    }
    Ok(repos)
}

fn inside_git_dir(path: &Path) -> bool {
    path.parent().and_then(Path::file_name) == Some(OsStr::new(GIT_DIR_NAME))
}
