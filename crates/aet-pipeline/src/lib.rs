//! The order tower state machine.
//!
//! ```text
//! incoming --validate--> processing --dedupe--> dispatch --record--> respond --> completed
//!     \                      \            \
//!      `------------------------------------`--> error outcome --> failed
//! ```
//!
//! One file is driven to a terminal directory before the next is picked up.
//! The ledger is the only shared mutable state and is owned by [`Pipeline`],
//! so check-then-record is never interleaved.

mod dirs;
mod machine;
mod reconcile;
mod registry;
mod stats;
mod watcher;

pub use dirs::{relocate, TowerDirs};
pub use machine::{FileDisposition, Pipeline};
pub use reconcile::{reconcile_processing, ReconcileReport};
pub use registry::ClientRegistry;
pub use stats::RunStats;
pub use watcher::{is_candidate, run_watch, Watcher};
