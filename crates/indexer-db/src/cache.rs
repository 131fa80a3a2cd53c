//! Commit cache storage

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::CacheError;

/// collection slug -> branch -> last indexed revision
type CacheData = BTreeMap<String, BTreeMap<String, String>>;

/// One (collection, branch, revision) triple, as listed by [`CommitCache::entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub collection: String,
    pub branch: String,
    pub commit: String,
}

/// Last successfully indexed revision per collection and branch
///
/// Shared by reference between workers; the map lives behind an internal
/// lock so `update` can be called concurrently.
pub struct CommitCache {
    /// Backing JSON document (`None` keeps the cache in memory only)
    path: Option<PathBuf>,

    data: Mutex<CacheData>,

    /// Held for the whole snapshot-write-rename sequence so an older
    /// snapshot can never be renamed over a newer one
    persist_lock: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CommitCache {
    /// Creates a cache that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(CacheData::new()),
            persist_lock: Mutex::new(()),
        }
    }

    /// Loads the cache document at `path`
    ///
    /// An empty path gives an in-memory cache. A missing or empty file is an
    /// empty cache; a file that does not decode is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(Self::in_memory());
        }

        let data = match std::fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => CacheData::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| CacheError::Decode {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => CacheData::new(),
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        log::debug!("Loaded commit cache {:?} ({} collections)", path, data.len());

        Ok(Self {
            path: Some(path.to_path_buf()),
            data: Mutex::new(data),
            persist_lock: Mutex::new(()),
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Revision last indexed for `slug` on `branch`
    pub fn lookup(&self, slug: &str, branch: &str) -> Option<String> {
        if slug.is_empty() || branch.is_empty() {
            return None;
        }
        lock(&self.data)
            .get(slug)
            .and_then(|branches| branches.get(branch))
            .cloned()
    }

    /// Records `commit` as indexed; does nothing if any argument is empty
    pub fn update(&self, slug: &str, branch: &str, commit: &str) {
        if slug.is_empty() || branch.is_empty() || commit.is_empty() {
            return;
        }
        lock(&self.data)
            .entry(slug.to_string())
            .or_default()
            .insert(branch.to_string(), commit.to_string());
    }

    /// Writes the cache atomically: temp file in the same directory, then rename
    ///
    /// The file is readable by the owning user only. In-memory caches are a no-op.
    pub fn persist(&self) -> Result<(), CacheError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _guard = lock(&self.persist_lock);
        let bytes = {
            let data = lock(&self.data);
            serde_json::to_vec_pretty(&*data).map_err(CacheError::Encode)?
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = |source: io::Error| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".commit-cache")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(write_err)?;
        restrict_permissions(tmp.as_file()).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        tmp.persist(path).map_err(|e| CacheError::Rename {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        log::info!("Commit cache saved to {:?}", path);
        Ok(())
    }

    /// All cached triples, sorted by collection then branch
    pub fn entries(&self) -> Vec<CacheEntry> {
        lock(&self.data)
            .iter()
            .flat_map(|(collection, branches)| {
                branches.iter().map(move |(branch, commit)| CacheEntry {
                    collection: collection.clone(),
                    branch: branch.clone(),
                    commit: commit.clone(),
                })
            })
            .collect()
    }

    /// Number of collections with at least one cached branch
    pub fn collection_count(&self) -> usize {
        lock(&self.data).len()
    }

    /// Number of cached (collection, branch) pairs
    pub fn entry_count(&self) -> usize {
        lock(&self.data).values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &std::fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &std::fs::File) -> io::Result<()> {
    Ok(())
}
