//! Object-store uploads over pre-signed URLs
//!
//! Single `PUT` for small blobs; fixed-size multipart for large ones. Any
//! non-200 response fails the upload; no retries happen at this layer.

use crate::{progress::ProgressTracker, Result, UploadError};
use luma_api::MultipartUploadUrls;
use reqwest::{header, Client, StatusCode};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Fixed part size for multipart uploads (20 MiB; last part may be short)
pub const MULTIPART_PART_SIZE: u64 = 20 * 1024 * 1024;

async fn expect_ok(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status() == StatusCode::OK {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    debug!(status, what, "object store rejected request");
    Err(UploadError::S3 { status, body })
}

/// PUT a byte buffer to a pre-signed URL with its base64 MD5
pub async fn put_bytes(http: &Client, url: &str, body: Vec<u8>, content_md5: &str) -> Result<()> {
    let response = http
        .put(url)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("Content-MD5", content_md5)
        .body(body)
        .send()
        .await?;
    expect_ok(response, "put").await?;
    Ok(())
}

/// PUT a file to a pre-signed URL with its base64 MD5
pub async fn put_object(http: &Client, url: &str, path: &Path, content_md5: &str) -> Result<()> {
    let body = tokio::fs::read(path).await?;
    debug!(path = %path.display(), size = body.len(), "uploading object");
    put_bytes(http, url, body, content_md5).await
}

/// Fill `buf` from an async reader until full or EOF; returns bytes read.
async fn read_full<R: AsyncReadExt + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Upload a file in fixed-size parts and complete the multipart upload.
///
/// Each part carries its own `Content-MD5`; the returned ETags are posted
/// to the completion URL in part order.
pub async fn upload_multipart(
    http: &Client,
    urls: &MultipartUploadUrls,
    path: &Path,
    part_md5s: &[String],
    progress: Option<&ProgressTracker>,
) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; MULTIPART_PART_SIZE as usize];
    let mut etags = Vec::with_capacity(urls.part_urls.len());

    for (index, part_url) in urls.part_urls.iter().enumerate() {
        let n = read_full(&mut file, &mut buf).await?;
        if n == 0 {
            break;
        }

        let response = http
            .put(part_url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header("Content-MD5", part_md5s[index].as_str())
            .body(buf[..n].to_vec())
            .send()
            .await?;
        let response = expect_ok(response, "put part").await?;

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UploadError::S3 {
                status: 200,
                body: format!("part {} upload succeeded but ETag is empty", index + 1),
            })?;
        etags.push(etag);

        debug!(part = index + 1, bytes = n, "uploaded part");
        if let Some(tracker) = progress {
            tracker.add_uploaded_bytes(n as i64);
        }
    }

    let xml = completion_xml(&etags);
    let response = http
        .post(&urls.complete_url)
        .header(header::CONTENT_TYPE, "application/xml")
        .body(xml)
        .send()
        .await?;
    expect_ok(response, "complete multipart").await?;

    Ok(())
}

/// Build the `CompleteMultipartUpload` payload with 1-based part numbers
fn completion_xml(etags: &[String]) -> String {
    let mut xml = String::from("<CompleteMultipartUpload>");
    for (index, etag) in etags.iter().enumerate() {
        xml.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>\"{}\"</ETag></Part>",
            index + 1,
            etag
        ));
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_xml_lists_parts_in_order() {
        let xml = completion_xml(&["etag-one".to_string(), "etag-two".to_string()]);
        assert_eq!(
            xml,
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>\"etag-one\"</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>\"etag-two\"</ETag></Part>\
             </CompleteMultipartUpload>"
        );
        let first = xml.find("<PartNumber>1</PartNumber>").unwrap();
        let second = xml.find("<PartNumber>2</PartNumber>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn completion_xml_empty_has_no_parts() {
        assert_eq!(
            completion_xml(&[]),
            "<CompleteMultipartUpload></CompleteMultipartUpload>"
        );
    }
}
