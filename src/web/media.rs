use axum::body::Bytes;
use std::path::Path;

use super::errors::AppError;
use crate::models::IMAGE_DIR;

/// Longest file stem kept from the client-supplied name.
const MAX_STEM: usize = 50;

/// An uploaded image, not yet stored.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Write the upload under `<media_root>/task_images/` and return the path
/// relative to the media root. The bytes are stored as-is.
pub async fn store_image(media_root: &Path, upload: &Upload) -> Result<String, AppError> {
    let dir = media_root.join(IMAGE_DIR);
    tokio::fs::create_dir_all(&dir).await?;

    let name = stored_name(&upload.file_name);
    tokio::fs::write(dir.join(&name), &upload.bytes).await?;
    tracing::debug!(file = %name, size = upload.bytes.len(), "stored image");

    Ok(format!("{IMAGE_DIR}/{name}"))
}

/// Sanitized client file name with a random suffix so uploads never
/// overwrite each other.
fn stored_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };

    let mut stem: String = clean(stem).chars().take(MAX_STEM).collect();
    if stem.trim_matches('_').is_empty() {
        stem = "image".to_string();
    }
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..7];

    match ext.map(clean).filter(|e| !e.is_empty()) {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_ascii_lowercase()),
        None => format!("{stem}_{suffix}"),
    }
}
