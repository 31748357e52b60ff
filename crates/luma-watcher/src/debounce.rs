//! Write-completion debouncing
//!
//! A path is dispatched only after its events go quiet for the debounce
//! window. Every new event resets the path's one-shot timer, so a file
//! still being written keeps pushing its dispatch out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Debounces per-path filesystem events into single dispatches
pub struct DebounceQueue {
    duration: Duration,
    timers: Arc<Mutex<HashMap<PathBuf, JoinHandle<()>>>>,
    dispatch_tx: mpsc::UnboundedSender<PathBuf>,
}

impl DebounceQueue {
    /// Create a queue; dispatched paths arrive on the returned receiver.
    pub fn new(duration: Duration) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        (
            Self {
                duration,
                timers: Arc::new(Mutex::new(HashMap::new())),
                dispatch_tx,
            },
            dispatch_rx,
        )
    }

    /// Record an event for `path`, resetting its timer.
    pub fn touch(&self, path: PathBuf) {
        let mut timers = self.timers.lock().unwrap();
        if let Some(previous) = timers.remove(&path) {
            previous.abort();
        }

        let duration = self.duration;
        let dispatch_tx = self.dispatch_tx.clone();
        let timers_ref = Arc::clone(&self.timers);
        let key = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            timers_ref.lock().unwrap().remove(&key);
            let _ = dispatch_tx.send(key);
        });
        timers.insert(path, handle);
    }

    /// Cancel every pending timer.
    pub fn stop(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    /// Number of paths currently waiting out their window
    pub fn pending(&self) -> usize {
        self.timers.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn repeated_events_dispatch_once() {
        let (queue, mut rx) = DebounceQueue::new(Duration::from_millis(100));
        let path = PathBuf::from("/w/a.jpg");

        for _ in 0..5 {
            queue.touch(path.clone());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().unwrap(), path);
        assert!(rx.try_recv().is_err(), "only one dispatch expected");
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_event_resets_the_window() {
        let (queue, mut rx) = DebounceQueue::new(Duration::from_millis(100));
        let path = PathBuf::from("/w/a.jpg");

        queue.touch(path.clone());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err(), "window has not elapsed");

        queue.touch(path.clone());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err(), "window was reset");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(rx.try_recv().unwrap(), path);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_paths_dispatch_independently() {
        let (queue, mut rx) = DebounceQueue::new(Duration::from_millis(50));
        queue.touch(PathBuf::from("/w/a.jpg"));
        queue.touch(PathBuf::from("/w/b.jpg"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        let mut dispatched = vec![rx.try_recv().unwrap(), rx.try_recv().unwrap()];
        dispatched.sort();
        assert_eq!(
            dispatched,
            vec![PathBuf::from("/w/a.jpg"), PathBuf::from("/w/b.jpg")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_timers() {
        let (queue, mut rx) = DebounceQueue::new(Duration::from_millis(50));
        queue.touch(PathBuf::from("/w/a.jpg"));
        queue.stop();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(queue.pending(), 0);
    }
}
