//! Error types for indexer-db

use std::io;
use std::path::PathBuf;

/// Errors raised while loading or saving the commit cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("read commit cache {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decode commit cache {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode commit cache: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("write commit cache {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("persist commit cache {path:?}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
