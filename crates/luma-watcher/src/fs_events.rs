//! Recursive filesystem subscription
//!
//! Wraps a `notify` watcher and forwards the events the pipeline cares
//! about (create/write on whitelisted image files, new directories) into
//! a tokio channel. Recursive mode keeps newly created directories
//! subscribed; they are still surfaced as events so the orchestrator can
//! log them.

use crate::Result;
use luma_uploader::is_image_file;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::warn;

/// An event the watch orchestrator reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsEvent {
    /// A whitelisted image file was created or written
    FileChanged(PathBuf),
    /// A directory appeared under the watched root
    NewDirectory(PathBuf),
}

/// Recursive watch over a directory tree.
///
/// Dropping the watcher stops the subscription.
pub struct FileWatcher {
    // Held for its Drop: unsubscribes the notify backend.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Subscribe recursively to `root` and stream events
    pub fn new(root: &Path) -> Result<(Self, mpsc::UnboundedReceiver<FsEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                match result {
                    Ok(event) => handle_event(&tx, event),
                    Err(e) => warn!("watch error: {e}"),
                }
            })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok((Self { _watcher: watcher }, rx))
    }
}

fn handle_event(tx: &mpsc::UnboundedSender<FsEvent>, event: notify::Event) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }

    for path in event.paths {
        // The file may be gone again by the time the event arrives.
        let Ok(info) = std::fs::metadata(&path) else {
            continue;
        };
        if info.is_dir() {
            let _ = tx.send(FsEvent::NewDirectory(path));
        } else if info.is_file() && is_image_file(&path) {
            let _ = tx.send(FsEvent::FileChanged(path));
        }
    }
}
