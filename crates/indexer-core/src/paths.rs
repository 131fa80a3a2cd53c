//! Lexical path helpers
//!
//! Nothing here touches the filesystem: repository paths are compared as
//! written, after `.`/`..` folding.

use std::path::{Component, Path, PathBuf};

/// Folds `.` and `..` components without resolving symlinks
///
/// A `..` directly below the root is dropped; leading `..` components of a
/// relative path are kept. An empty result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Components leading from `base` to `target`, `..` included
///
/// Returns an empty list when both paths are the same directory.
pub fn relative_components(base: &Path, target: &Path) -> Vec<String> {
    let base = clean_path(base);
    let target = clean_path(target);

    let base_parts: Vec<Component<'_>> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let target_parts: Vec<Component<'_>> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        rel.push("..".to_string());
    }
    for part in &target_parts[common..] {
        rel.push(part.as_os_str().to_string_lossy().into_owned());
    }
    rel
}

/// `target` relative to `base`, joined with forward slashes (`.` when equal)
pub fn relative_slash_path(base: &Path, target: &Path) -> String {
    let rel = relative_components(base, target);
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel.join("/")
    }
}
