//! `luma upload` command

use crate::config::Account;
use clap::Args;
use luma_uploader::{
    check_ffmpeg, format_bytes, is_image_file, UploadConfig, UploadSummary, Uploader,
    DEFAULT_ALBUM_NAME, DEFAULT_WORKERS,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Image files or directories to upload
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Album name
    #[arg(short, long, default_value = DEFAULT_ALBUM_NAME)]
    pub album: String,

    /// Create the album if it doesn't exist
    #[arg(short = 'c', long)]
    pub create_album: bool,

    /// Recursively upload directories
    #[arg(short, long)]
    pub recursive: bool,

    /// Number of concurrent uploads
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Upload even if a duplicate exists
    #[arg(long)]
    pub force: bool,
}

/// Exit code: 0 when everything completed, 1 when any file failed
pub async fn run(account: Account, args: UploadArgs) -> anyhow::Result<i32> {
    check_ffmpeg()
        .await
        .map_err(|e| anyhow::anyhow!("{e}\nPlease install ffmpeg and ensure it's in your PATH"))?;

    let files = discover_files(&args.paths, args.recursive)?;
    if files.is_empty() {
        println!("No image files found to upload");
        return Ok(1);
    }
    println!("Found {} image(s) to upload", files.len());

    // The default album is always created on demand.
    let create_album = args.create_album || args.album == DEFAULT_ALBUM_NAME;
    let config = UploadConfig {
        workers: args.workers,
        force_upload: args.force,
        create_album,
        ..UploadConfig::default()
    };

    let uploader = Uploader::new(account.client, account.store, account.keys, config);
    let summary = uploader.upload_files(files, &args.album).await?;
    print_summary(&summary);

    Ok(if summary.failed_files > 0 { 1 } else { 0 })
}

/// Expand the given paths into a deduplicated list of image files
pub fn discover_files(paths: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        collect_files(path, recursive, &mut files, &mut seen)?;
    }

    Ok(files)
}

fn collect_files(
    path: &Path,
    recursive: bool,
    files: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
) -> anyhow::Result<()> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|e| anyhow::anyhow!("failed to resolve path '{}': {e}", path.display()))?;
    if !seen.insert(absolute.clone()) {
        return Ok(());
    }

    let info = std::fs::metadata(&absolute)?;
    if info.is_dir() {
        if !recursive {
            anyhow::bail!(
                "'{}' is a directory (use -r for recursive upload)",
                path.display()
            );
        }
        for entry in walkdir::WalkDir::new(&absolute)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let entry_path = entry.path().to_path_buf();
            if entry.file_type().is_file()
                && is_image_file(&entry_path)
                && seen.insert(entry_path.clone())
            {
                files.push(entry_path);
            }
        }
    } else if is_image_file(&absolute) {
        files.push(absolute);
    }

    Ok(())
}

fn print_summary(summary: &UploadSummary) {
    println!("\n=== Upload Summary ===");
    println!("Total files: {}", summary.total_files);
    println!("Completed: {}", summary.completed_files);

    if summary.skipped_files > 0 {
        println!("Skipped (duplicates): {}", summary.skipped_files);
    }

    if summary.failed_files > 0 {
        println!("Failed: {}", summary.failed_files);
        if !summary.errors.is_empty() {
            println!("\nErrors:");
            for entry in &summary.errors {
                println!("  - {}: {}", entry.file_name, entry.error);
            }
        }
    }

    println!("Total uploaded: {}", format_bytes(summary.uploaded_bytes));
}
