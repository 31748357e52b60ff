//! Thumbnail generation via ffmpeg
//!
//! Produces a JPEG fitting within 720x720, preserving aspect ratio, at
//! quality 75 with one retry at quality 60 when the result exceeds
//! 200 KiB.

use crate::{Result, UploadError};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Maximum thumbnail edge length in pixels
pub const THUMBNAIL_MAX_DIMENSION: u32 = 720;

/// Size threshold that triggers the lower-quality retry
pub const THUMBNAIL_MAX_BYTES: usize = 200 * 1024;

const THUMBNAIL_QUALITY: u32 = 75;
const THUMBNAIL_QUALITY_LOW: u32 = 60;

/// Verify that ffmpeg is invokable
pub async fn check_ffmpeg() -> Result<()> {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .map_err(|e| UploadError::Thumbnail(format!("ffmpeg not found in PATH: {}", e)))?;
    Ok(())
}

/// Generate a bounded-size JPEG thumbnail for an image
pub async fn generate_thumbnail(image_path: &Path) -> Result<Vec<u8>> {
    let temp_dir = tempfile::tempdir()?;
    let output_path = temp_dir.path().join("thumbnail.jpg");

    run_ffmpeg(image_path, &output_path, THUMBNAIL_QUALITY).await?;
    let mut data = tokio::fs::read(&output_path).await?;

    if data.len() > THUMBNAIL_MAX_BYTES {
        debug!(
            size = data.len(),
            "thumbnail over size budget, retrying at lower quality"
        );
        run_ffmpeg(image_path, &output_path, THUMBNAIL_QUALITY_LOW).await?;
        data = tokio::fs::read(&output_path).await?;
    }

    Ok(data)
}

async fn run_ffmpeg(input: &Path, output: &Path, quality: u32) -> Result<()> {
    // JPEG quality percentage maps onto ffmpeg's -q:v scale (2 best, 31 worst).
    let q_scale = 2 + ((100 - quality) * 29 / 100);
    let scale = format!(
        "scale={0}:{0}:force_original_aspect_ratio=decrease",
        THUMBNAIL_MAX_DIMENSION
    );

    let output_result = Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .arg("-vf")
        .arg(&scale)
        .arg("-q:v")
        .arg(q_scale.to_string())
        .arg("-y")
        .arg(output)
        .output()
        .await
        .map_err(|e| UploadError::Thumbnail(format!("ffmpeg not found in PATH: {}", e)))?;

    if !output_result.status.success() {
        return Err(UploadError::Thumbnail(format!(
            "ffmpeg exited with {}: {}",
            output_result.status,
            String::from_utf8_lossy(&output_result.stderr)
        )));
    }

    Ok(())
}
