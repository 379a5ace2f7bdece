//! Filename extraction, sanitization, and path resolution for downloads.
//!
//! This module derives safe filenames from Content-Disposition headers and
//! URLs, and resolves collision-free destination paths.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use tracing::debug;
use url::Url;

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Resolves the destination filename for a response.
///
/// Order: Content-Disposition `filename`/`filename*` parameter, then the last
/// path segment of `url` (the query string is never part of it). Returns
/// `None` when both are empty.
pub(crate) fn resolve_filename(content_disposition: Option<&str>, url: &Url) -> Option<String> {
    content_disposition
        .and_then(parse_content_disposition)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| filename_from_url(url))
        .map(|name| sanitize_filename(&name))
}

/// Last non-empty path segment of `url`, percent-decoded.
pub(crate) fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).unwrap_or_else(|e| {
        debug!(
            segment = %last,
            error = %e,
            "URL decoding failed, using raw segment"
        );
        last.into()
    });
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles:
/// - `attachment; filename="example.iso"`
/// - `attachment; filename=example.iso`
/// - `attachment; filename*=UTF-8''example.iso` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    // Try filename*= first (RFC 5987 encoded)
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        // Format: charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = header.find("filename=") {
        let value = header[pos + 9..].trim();

        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
        } else {
            // Unquoted - take until ; or end
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim().trim_matches('\'');
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Output location owned by one session.
///
/// The file exists (empty) as soon as it is claimed, and so does the parts
/// directory when one was requested, so no other session can pick the same
/// names.
#[derive(Debug)]
pub(crate) struct ClaimedPath {
    pub(crate) path: PathBuf,
    pub(crate) file: File,
    pub(crate) parts_dir: Option<PathBuf>,
}

/// Claims a collision-free destination in `dir`, adding a numeric suffix if
/// the name is taken.
///
/// `file.iso`, then `file_1.iso`, `file_2.iso`, ... The file is created with
/// `create_new`, and with `with_parts_dir` its `_parts` sibling with a
/// non-recursive `create_dir`; either one already existing moves on to the
/// next name.
///
/// # Errors
///
/// Returns the I/O error of any create call that fails for a reason other
/// than the name being taken.
pub(crate) async fn claim_unique_path(
    dir: &Path,
    filename: &str,
    with_parts_dir: bool,
) -> std::io::Result<ClaimedPath> {
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            dir.join(filename)
        } else {
            dir.join(format!("{stem}_{attempt}{ext}"))
        };
        if let Some(claimed) = try_claim(candidate, with_parts_dir).await? {
            return Ok(claimed);
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let candidate = dir.join(format!("{stem}_{timestamp}{ext}"));
    try_claim(candidate, with_parts_dir).await?.ok_or_else(|| {
        std::io::Error::new(ErrorKind::AlreadyExists, "no free destination name")
    })
}

async fn try_claim(path: PathBuf, with_parts_dir: bool) -> std::io::Result<Option<ClaimedPath>> {
    let parts_dir = parts_dir_for(&path);
    // A leftover parts directory belongs to someone else's transfer.
    if !with_parts_dir && tokio::fs::try_exists(&parts_dir).await? {
        return Ok(None);
    }

    let file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(e),
    };

    if !with_parts_dir {
        debug!(path = %path.display(), "claimed destination");
        return Ok(Some(ClaimedPath {
            path,
            file,
            parts_dir: None,
        }));
    }

    match tokio::fs::create_dir(&parts_dir).await {
        Ok(()) => {
            debug!(path = %path.display(), "claimed destination and parts directory");
            Ok(Some(ClaimedPath {
                path,
                file,
                parts_dir: Some(parts_dir),
            }))
        }
        Err(e) => {
            // Release the file we just created; the name is unusable.
            drop(file);
            if let Err(remove_error) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %remove_error, "failed to release destination");
            }
            if e.kind() == ErrorKind::AlreadyExists {
                Ok(None)
            } else {
                Err(e)
            }
        }
    }
}

/// Parts directory for a destination: a sibling named `<filename>_parts`.
pub(crate) fn parts_dir_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(super::constants::PARTS_DIR_SUFFIX);
    destination.with_file_name(name)
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
