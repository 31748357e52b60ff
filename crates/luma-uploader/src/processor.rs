//! File validation, hashing, and metadata extraction

use crate::{Result, UploadError};
use serde::Serialize;
use std::io::BufReader;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Supported image extensions (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: [&str; 10] = [
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "tiff", "tif",
];

/// File type discriminant used in catalog metadata
pub const FILE_TYPE_IMAGE: u8 = 0;

/// True when the path carries a whitelisted image extension
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Validate that the path is an existing, readable, whitelisted image file
pub fn validate_image_file(path: &Path) -> Result<()> {
    let info = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            UploadError::Validation(format!("file not found: {}", path.display()))
        } else {
            UploadError::Validation(format!("failed to stat {}: {}", path.display(), e))
        }
    })?;

    if info.is_dir() {
        return Err(UploadError::Validation(format!(
            "path is a directory: {}",
            path.display()
        )));
    }

    std::fs::File::open(path)
        .map_err(|e| UploadError::Validation(format!("file not readable: {}", e)))?;

    if !is_image_file(path) {
        return Err(UploadError::Validation(format!(
            "unsupported file type: {} (supported: {})",
            path.display(),
            IMAGE_EXTENSIONS.join(", ")
        )));
    }

    Ok(())
}

/// Metadata extracted from an image, serialized into the encrypted
/// metadata stream of the catalog entry.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub title: String,
    /// Microseconds since epoch
    pub creation_time: i64,
    /// Microseconds since epoch
    pub modification_time: i64,
    pub file_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Plaintext size; not part of the serialized metadata
    #[serde(skip)]
    pub file_size: i64,
}

/// Extract metadata for an image file.
///
/// Times come from the filesystem and are refined from EXIF when present;
/// any EXIF failure downgrades to the stat-derived values only.
pub fn extract_metadata(path: &Path) -> Result<FileMetadata> {
    let info = std::fs::metadata(path)
        .map_err(|e| UploadError::Metadata(format!("failed to stat {}: {}", path.display(), e)))?;

    let modified_micros = info
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0);

    let mut metadata = FileMetadata {
        title: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        creation_time: modified_micros,
        modification_time: modified_micros,
        file_type: FILE_TYPE_IMAGE,
        latitude: None,
        longitude: None,
        width: None,
        height: None,
        file_size: info.len() as i64,
    };

    if let Err(e) = apply_exif(path, &mut metadata) {
        debug!(path = %path.display(), "no usable exif data: {e}");
    }

    Ok(metadata)
}

/// Refine metadata from EXIF. Absence of EXIF is not an error for the
/// caller; this only returns Err so the miss can be logged.
fn apply_exif(path: &Path, metadata: &mut FileMetadata) -> std::result::Result<(), exif::Error> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    if let Some(micros) = exif_datetime_micros(&exif, exif::Tag::DateTimeOriginal)
        .or_else(|| exif_datetime_micros(&exif, exif::Tag::DateTime))
    {
        metadata.creation_time = micros;
    }

    if let Some((latitude, longitude)) = exif_gps(&exif) {
        metadata.latitude = Some(latitude);
        metadata.longitude = Some(longitude);
    }

    metadata.width = exif_uint(&exif, exif::Tag::PixelXDimension)
        .or_else(|| exif_uint(&exif, exif::Tag::ImageWidth));
    metadata.height = exif_uint(&exif, exif::Tag::PixelYDimension)
        .or_else(|| exif_uint(&exif, exif::Tag::ImageLength));

    Ok(())
}

fn exif_uint(exif: &exif::Exif, tag: exif::Tag) -> Option<u32> {
    exif.get_field(tag, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

fn exif_datetime_micros(exif: &exif::Exif, tag: exif::Tag) -> Option<i64> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    let ascii = match &field.value {
        exif::Value::Ascii(values) => values.first()?,
        _ => return None,
    };
    let dt = exif::DateTime::from_ascii(ascii).ok()?;
    let date = chrono::NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?;
    let datetime = date.and_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)?;
    Some(datetime.and_utc().timestamp_micros())
}

fn exif_gps(exif: &exif::Exif) -> Option<(f64, f64)> {
    let latitude = exif_coordinate(exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef, b'S')?;
    let longitude =
        exif_coordinate(exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef, b'W')?;
    Some((latitude, longitude))
}

/// Convert a degrees/minutes/seconds rational triple plus hemisphere
/// reference into a signed decimal coordinate.
fn exif_coordinate(
    exif: &exif::Exif,
    value_tag: exif::Tag,
    ref_tag: exif::Tag,
    negative_ref: u8,
) -> Option<f64> {
    let field = exif.get_field(value_tag, exif::In::PRIMARY)?;
    let rationals = match &field.value {
        exif::Value::Rational(values) if values.len() >= 3 => values,
        _ => return None,
    };
    let degrees = rationals[0].to_f64();
    let minutes = rationals[1].to_f64();
    let seconds = rationals[2].to_f64();
    let mut coordinate = degrees + minutes / 60.0 + seconds / 3600.0;

    if let Some(reference) = exif.get_field(ref_tag, exif::In::PRIMARY) {
        if let exif::Value::Ascii(values) = &reference.value {
            if values
                .first()
                .and_then(|v| v.first())
                .map(|&c| c.to_ascii_uppercase() == negative_ref)
                .unwrap_or(false)
            {
                coordinate = -coordinate;
            }
        }
    }

    Some(coordinate)
}

/// Current time in microseconds since epoch
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn recognizes_image_extensions() {
        assert!(is_image_file(Path::new("/tmp/a.jpg")));
        assert!(is_image_file(Path::new("/tmp/a.JPEG")));
        assert!(is_image_file(Path::new("/tmp/a.heic")));
        assert!(!is_image_file(Path::new("/tmp/a.mp4")));
        assert!(!is_image_file(Path::new("/tmp/noext")));
    }

    #[test]
    fn validation_rejects_missing_file() {
        let result = validate_image_file(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(UploadError::Validation(_))));
    }

    #[test]
    fn validation_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let named = dir.path().join("album.jpg");
        std::fs::create_dir(&named).unwrap();
        assert!(matches!(
            validate_image_file(&named),
            Err(UploadError::Validation(_))
        ));
    }

    #[test]
    fn validation_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();
        assert!(matches!(
            validate_image_file(&path),
            Err(UploadError::Validation(_))
        ));
    }

    #[test]
    fn validation_accepts_plain_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"not really a png").unwrap();
        assert!(validate_image_file(&path).is_ok());
    }

    #[test]
    fn metadata_falls_back_to_stat_times() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg without exif").unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert_eq!(metadata.title, "photo.jpg");
        assert_eq!(metadata.file_type, FILE_TYPE_IMAGE);
        assert_eq!(metadata.creation_time, metadata.modification_time);
        assert!(metadata.creation_time > 0);
        assert_eq!(metadata.file_size, 17);
        assert!(metadata.latitude.is_none());
    }

    #[test]
    fn metadata_serializes_to_canonical_shape() {
        let metadata = FileMetadata {
            title: "photo.jpg".into(),
            creation_time: 1_700_000_000_000_000,
            modification_time: 1_700_000_000_000_001,
            file_type: FILE_TYPE_IMAGE,
            latitude: None,
            longitude: None,
            width: Some(4000),
            height: Some(3000),
            file_size: 123,
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["title"], "photo.jpg");
        assert_eq!(value["creationTime"], 1_700_000_000_000_000i64);
        assert_eq!(value["modificationTime"], 1_700_000_000_000_001i64);
        assert_eq!(value["fileType"], 0);
        assert_eq!(value["width"], 4000);
        assert!(value.get("latitude").is_none());
        assert!(value.get("fileSize").is_none());
    }

    #[test]
    fn metadata_title_is_base_name() {
        let path = PathBuf::from("/photos/2024/trip/IMG_0001.jpeg");
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "IMG_0001.jpeg"
        );
    }
}
