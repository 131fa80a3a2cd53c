//! Change-set resolution for incremental indexing

use std::path::Path;

use crate::error::ChangeSetError;
use crate::git::Git;

/// Paths changed between `base` and the workspace's `HEAD`
///
/// Callers treat any error as "no change set" and fall back to a full run.
pub fn diff_since(git: &Git, workspace: &Path, base: &str) -> Result<Vec<String>, ChangeSetError> {
    if base.is_empty() {
        return Err(ChangeSetError::MissingBase);
    }
    let output = git.diff_name_only(workspace, base)?;
    Ok(parse_name_list(&output))
}

/// One path per non-blank line, in the order git printed them
pub fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let files = parse_name_list("src/lib.rs\r\n\r\n  README.md  \nCargo.toml\n");
        assert_eq!(files, vec!["src/lib.rs", "README.md", "Cargo.toml"]);
    }

    #[test]
    fn test_empty_base_is_rejected_before_git_runs() {
        let git = Git::with_program("/nonexistent/git");
        let err = diff_since(&git, Path::new("."), "").unwrap_err();
        assert!(matches!(err, ChangeSetError::MissingBase));
    }
}
