//! Incremental synchronization: ingestion cycle, deletion scanner and the
//! category cache the ingestion cycle resolves through.

mod category_cache;
mod deletion;
mod engine;

pub use category_cache::CategoryCache;
pub use deletion::{scan_window, DeletionScanner, ScanReport};
pub use engine::{SyncEngine, SyncReport};
