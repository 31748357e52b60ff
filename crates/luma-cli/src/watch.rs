//! `luma watch` command

use crate::config::Account;
use clap::Args;
use luma_store::WatchMode;
use luma_uploader::{check_ffmpeg, DEFAULT_ALBUM_NAME, DEFAULT_WORKERS};
use luma_watcher::{load_or_create_state, Watcher};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Folder to watch
    pub folder: PathBuf,

    /// Upload everything to this album
    #[arg(short, long, conflicts_with = "folder_albums")]
    pub album: Option<String>,

    /// Each subfolder becomes an album
    #[arg(long)]
    pub folder_albums: bool,

    /// Number of concurrent uploads
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// File write debounce in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub debounce: u64,

    /// Process existing files on startup
    #[arg(long)]
    pub initial_scan: bool,
}

pub async fn run(account: Account, args: WatchArgs) -> anyhow::Result<i32> {
    check_ffmpeg()
        .await
        .map_err(|e| anyhow::anyhow!("{e}\nPlease install ffmpeg and ensure it's in your PATH"))?;

    let root = std::fs::canonicalize(&args.folder)
        .map_err(|e| anyhow::anyhow!("invalid path '{}': {e}", args.folder.display()))?;
    if !root.is_dir() {
        anyhow::bail!("path '{}' is not a directory", root.display());
    }

    let (mode, album_name) = match (&args.album, args.folder_albums) {
        (_, true) => (WatchMode::FolderAlbums, String::new()),
        (Some(album), false) => (WatchMode::Specified, album.clone()),
        (None, false) => (WatchMode::Default, DEFAULT_ALBUM_NAME.to_string()),
    };

    let state = load_or_create_state(
        &account.store,
        &root.to_string_lossy(),
        mode,
        album_name,
        args.workers,
        args.debounce,
    )?;

    println!("Watching folder: {}", root.display());
    println!("Mode: {}", state.mode);
    if state.mode == WatchMode::Specified {
        println!("Album: {}", state.album_name);
    }
    println!("Workers: {}", state.workers);
    println!("Debounce: {}ms", state.debounce_ms);
    println!("\nPress Ctrl+C to stop watching...");

    let watcher = Arc::new(Watcher::new(
        account.client,
        account.store,
        account.keys,
        state,
    ));
    watcher.run(args.initial_scan).await?;

    println!("Watch stopped");
    Ok(0)
}
