//! Indexer DB - Persistent commit cache
//!
//! Remembers, per collection slug and branch, the last revision the agent
//! indexed successfully. Stored as a single pretty-printed JSON document:
//!
//! ```json
//! { "services_api": { "main": "3f2c1e0..." } }
//! ```

mod cache;
mod error;

pub use cache::{CacheEntry, CommitCache};
pub use error::CacheError;
