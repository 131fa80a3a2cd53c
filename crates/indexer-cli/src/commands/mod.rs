//! Command implementations

mod index;
mod stats;

pub use index::{cmd_index, IndexArgs};
pub use stats::cmd_stats;
