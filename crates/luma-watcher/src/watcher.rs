//! Watch orchestrator
//!
//! Owns the lifecycle of one watched folder: filesystem subscription,
//! debouncing, album routing per mode, duplicate handling, uploads, and
//! restart-safe state. Shutdown stops the subscription, cancels pending
//! timers, drains in-flight uploads for up to 30 seconds, and persists
//! the watch state.

use crate::{
    debounce::DebounceQueue,
    duplicate::{DuplicateHandler, DuplicateOutcome},
    fs_events::{FileWatcher, FsEvent},
    Result, WatchError,
};
use luma_api::ApiClient;
use luma_crypto::{sha256_file, SecretKey};
use luma_store::{Store, WatchMode, WatchState};
use luma_uploader::{
    is_image_file, AccountKeys, UploadConfig, UploadError, Uploader, DEFAULT_ALBUM_NAME,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// How long shutdown waits for in-flight uploads
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);

/// Cached album identity and key
#[derive(Clone)]
pub struct AlbumInfo {
    pub id: i64,
    pub key: SecretKey,
}

/// Sanitize a folder name into an album name: trim, turn path separators
/// into spaces, collapse whitespace runs, and fall back to the default
/// album for empty results.
pub fn sanitize_album_name(folder_name: &str) -> String {
    let replaced: String = folder_name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == std::path::MAIN_SEPARATOR {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        DEFAULT_ALBUM_NAME.to_string()
    } else {
        collapsed
    }
}

/// Album routing: which album a dispatched path belongs to under a mode.
///
/// In folder-albums mode the parent directory relative to the watch root
/// names the album; files directly under the root use the default album.
pub fn album_name_for_path(
    root: &Path,
    file_path: &Path,
    mode: WatchMode,
    configured_album: &str,
) -> String {
    match mode {
        WatchMode::Default => DEFAULT_ALBUM_NAME.to_string(),
        WatchMode::Specified => configured_album.to_string(),
        WatchMode::FolderAlbums => {
            let relative_dir = file_path
                .parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default();
            if relative_dir.is_empty() {
                DEFAULT_ALBUM_NAME.to_string()
            } else {
                sanitize_album_name(&relative_dir)
            }
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Load the persisted state for a watch path, carrying over its original
/// start time, and apply the current run's configuration.
pub fn load_or_create_state(
    store: &Store,
    watch_path: &str,
    mode: WatchMode,
    album_name: String,
    workers: usize,
    debounce_ms: u64,
) -> Result<WatchState> {
    let started_at = store
        .get_watch_state(watch_path)?
        .map(|existing| existing.started_at)
        .unwrap_or_else(now_secs);

    let state = WatchState {
        watch_path: watch_path.to_string(),
        mode,
        album_name,
        workers,
        debounce_ms,
        started_at,
        last_processed: now_secs(),
    };
    store.save_watch_state(&state)?;
    Ok(state)
}

/// Watches one folder and uploads whatever appears under it
pub struct Watcher {
    client: Arc<ApiClient>,
    store: Arc<Store>,
    keys: Arc<AccountKeys>,
    state: Mutex<WatchState>,
    uploader: Uploader,
    duplicates: DuplicateHandler,
    album_cache: RwLock<HashMap<String, AlbumInfo>>,
    processing: Mutex<HashSet<PathBuf>>,
    upload_slots: Arc<Semaphore>,
}

impl Watcher {
    pub fn new(
        client: Arc<ApiClient>,
        store: Arc<Store>,
        keys: Arc<AccountKeys>,
        state: WatchState,
    ) -> Self {
        let config = UploadConfig {
            workers: state.workers,
            force_upload: false,
            create_album: true,
            ..UploadConfig::default()
        };
        let uploader = Uploader::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&keys),
            config,
        );
        let duplicates =
            DuplicateHandler::new(Arc::clone(&client), Arc::clone(&store), Arc::clone(&keys));
        let upload_slots = Arc::new(Semaphore::new(state.workers.max(1)));

        Self {
            client,
            store,
            keys,
            state: Mutex::new(state),
            uploader,
            duplicates,
            album_cache: RwLock::new(HashMap::new()),
            processing: Mutex::new(HashSet::new()),
            upload_slots,
        }
    }

    fn state_snapshot(&self) -> WatchState {
        self.state.lock().unwrap().clone()
    }

    /// Walk the tree and process every image already present
    async fn run_initial_scan(watcher: &Arc<Self>, tasks: &mut JoinSet<()>) {
        let root = PathBuf::from(watcher.state_snapshot().watch_path);
        let mut found = 0usize;
        for entry in walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let path = entry.path().to_path_buf();
            if entry.file_type().is_file() && is_image_file(&path) {
                found += 1;
                Self::spawn_process(watcher, tasks, path);
            }
        }
        info!(found, "initial scan complete");
    }

    /// Run until Ctrl-C. Consumes filesystem events through the debouncer
    /// and spawns one bounded task per dispatched path.
    pub async fn run(self: Arc<Self>, initial_scan: bool) -> Result<()> {
        let state = self.state_snapshot();
        let root = PathBuf::from(&state.watch_path);

        let (fs_watcher, mut fs_events) = FileWatcher::new(&root)?;
        let (debounce, mut dispatches) =
            DebounceQueue::new(Duration::from_millis(state.debounce_ms));

        info!(
            path = %root.display(),
            mode = %state.mode,
            workers = state.workers,
            debounce_ms = state.debounce_ms,
            "watching folder"
        );

        let mut tasks = JoinSet::new();
        if initial_scan {
            Self::run_initial_scan(&self, &mut tasks).await;
        }

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    if let Err(e) = signal {
                        warn!("failed to listen for shutdown signal: {e}");
                    }
                    break;
                }
                event = fs_events.recv() => {
                    match event {
                        Some(FsEvent::FileChanged(path)) => debounce.touch(path),
                        Some(FsEvent::NewDirectory(path)) => {
                            info!(path = %path.display(), "new directory detected");
                        }
                        None => break,
                    }
                }
                dispatched = dispatches.recv() => {
                    if let Some(path) = dispatched {
                        Self::spawn_process(&self, &mut tasks, path);
                    }
                }
            }
        }

        info!("shutting down watcher");
        drop(fs_watcher);
        debounce.stop();

        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(SHUTDOWN_DRAIN, drain).await.is_err() {
            warn!("shutdown timeout - some uploads may be incomplete");
            tasks.abort_all();
        }

        self.persist_state()?;
        Ok(())
    }

    fn spawn_process(watcher: &Arc<Self>, tasks: &mut JoinSet<()>, path: PathBuf) {
        let watcher = Arc::clone(watcher);
        tasks.spawn(async move {
            watcher.process_path(&path).await;
        });
    }

    /// Handle one dispatched path: route to an album, dedupe, upload.
    ///
    /// A per-path guard set keeps duplicate dispatches that slip past the
    /// debouncer from processing the same file concurrently.
    pub async fn process_path(&self, path: &Path) {
        {
            let mut processing = self.processing.lock().unwrap();
            if !processing.insert(path.to_path_buf()) {
                return;
            }
        }

        let outcome = self.process_path_inner(path).await;
        if let Err(e) = &outcome {
            println!(
                "✗ Failed: {} - {}",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                e
            );
        }

        self.processing.lock().unwrap().remove(path);

        {
            let mut state = self.state.lock().unwrap();
            state.last_processed = now_secs();
            if let Err(e) = self.store.save_watch_state(&state) {
                warn!("failed to save watch state: {e}");
            }
        }
    }

    async fn process_path_inner(&self, path: &Path) -> Result<()> {
        let _permit = self
            .upload_slots
            .acquire()
            .await
            .map_err(|_| WatchError::Upload(UploadError::Cancelled))?;

        let state = self.state_snapshot();
        let album_name = album_name_for_path(
            Path::new(&state.watch_path),
            path,
            state.mode,
            &state.album_name,
        );
        let album = self.resolve_album(&album_name).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let file_hash = {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || sha256_file(&path))
                .await
                .map_err(|e| WatchError::Upload(UploadError::Hash(e.to_string())))?
                .map_err(|e| WatchError::Upload(UploadError::Hash(e.to_string())))?
        };

        match self
            .duplicates
            .check_and_handle(&file_hash, path, album.id, &album.key)
            .await?
        {
            DuplicateOutcome::AlreadyInAlbum { .. } => {
                println!("○ Skipped: {} (already in album)", file_name);
                return Ok(());
            }
            DuplicateOutcome::AddedToAlbum { .. } => {
                println!("✓ Added to album: {} (duplicate)", file_name);
                return Ok(());
            }
            DuplicateOutcome::NotDuplicate => {}
        }

        match self.uploader.upload_single(path, album.id, &album.key).await {
            Ok((file_id, _bytes)) => {
                println!("✓ Uploaded: {}", file_name);
                if let Err(e) = self
                    .duplicates
                    .save_uploaded(&file_hash, path, file_id, album.id)
                {
                    warn!("failed to save hash mapping: {e}");
                }
                Ok(())
            }
            Err(UploadError::AlreadyUploaded(_)) => {
                println!("○ Skipped: {} (duplicate)", file_name);
                Ok(())
            }
            Err(e) => {
                let error = WatchError::Upload(e);
                self.duplicates.save_failed(&file_hash, path, &error);
                Err(error)
            }
        }
    }

    /// Find or create an album, caching the id and key by name
    async fn resolve_album(&self, album_name: &str) -> Result<AlbumInfo> {
        if let Some(info) = self.album_cache.read().await.get(album_name) {
            return Ok(info.clone());
        }

        let (id, key) =
            luma_uploader::get_or_create_album(&self.client, &self.keys, album_name, true).await?;
        let info = AlbumInfo { id, key };

        self.album_cache
            .write()
            .await
            .insert(album_name.to_string(), info.clone());
        Ok(info)
    }

    fn persist_state(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        self.store.save_watch_state(&state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trims_and_collapses() {
        assert_eq!(sanitize_album_name("Trip  2024"), "Trip 2024");
        assert_eq!(sanitize_album_name("  Nested/Path  "), "Nested Path");
        assert_eq!(sanitize_album_name("a\\b/c"), "a b c");
        assert_eq!(sanitize_album_name("   "), DEFAULT_ALBUM_NAME);
        assert_eq!(sanitize_album_name(""), DEFAULT_ALBUM_NAME);
    }

    #[test]
    fn default_mode_routes_to_default_album() {
        let name = album_name_for_path(
            Path::new("/W"),
            Path::new("/W/Trip/a.jpg"),
            WatchMode::Default,
            "ignored",
        );
        assert_eq!(name, DEFAULT_ALBUM_NAME);
    }

    #[test]
    fn specified_mode_routes_to_configured_album() {
        let name = album_name_for_path(
            Path::new("/W"),
            Path::new("/W/Trip/a.jpg"),
            WatchMode::Specified,
            "Vacation 2024",
        );
        assert_eq!(name, "Vacation 2024");
    }

    #[test]
    fn folder_mode_uses_sanitized_parent() {
        let name = album_name_for_path(
            Path::new("/W"),
            Path::new("/W/Trip  2024/a.jpg"),
            WatchMode::FolderAlbums,
            "",
        );
        assert_eq!(name, "Trip 2024");
    }

    #[test]
    fn folder_mode_flattens_nested_directories() {
        let name = album_name_for_path(
            Path::new("/W"),
            Path::new("/W/2024/Summer/a.jpg"),
            WatchMode::FolderAlbums,
            "",
        );
        assert_eq!(name, "2024 Summer");
    }

    #[test]
    fn folder_mode_root_files_use_default_album() {
        let name = album_name_for_path(
            Path::new("/W"),
            Path::new("/W/a.jpg"),
            WatchMode::FolderAlbums,
            "",
        );
        assert_eq!(name, DEFAULT_ALBUM_NAME);
    }

    #[test]
    fn load_or_create_state_preserves_started_at() {
        let store = Store::open_in_memory().unwrap();
        let first = load_or_create_state(
            &store,
            "/photos",
            WatchMode::Default,
            String::new(),
            4,
            5000,
        )
        .unwrap();

        let second = load_or_create_state(
            &store,
            "/photos",
            WatchMode::Specified,
            "Album".into(),
            8,
            1000,
        )
        .unwrap();

        assert_eq!(second.started_at, first.started_at);
        assert_eq!(second.mode, WatchMode::Specified);
        assert_eq!(second.workers, 8);
    }
}
