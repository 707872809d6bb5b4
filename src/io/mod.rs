pub mod fsutil;
pub mod rules_io;
pub mod watcher;

pub use fsutil::atomic_write;
pub use watcher::{Debouncer, FileEvent, WorkspaceWatcher};
