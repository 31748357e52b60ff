//! # Luma Watcher
//!
//! Continuous ingestion: watch a directory tree, debounce file writes,
//! route files to albums per mode, deduplicate against the local hash
//! store (re-wrapping keys for cross-album duplicates), and upload the
//! rest.

pub mod debounce;
pub mod duplicate;
pub mod error;
pub mod fs_events;
pub mod watcher;

pub use debounce::DebounceQueue;
pub use duplicate::{rewrap_file_key, DuplicateHandler, DuplicateOutcome};
pub use error::{Result, WatchError};
pub use fs_events::{FileWatcher, FsEvent};
pub use watcher::{
    album_name_for_path, load_or_create_state, sanitize_album_name, AlbumInfo, Watcher,
};
