//! Tree photo storage
//!
//! Uploaded photos are written under `<media_root>/tree_photos/` and the
//! entry keeps the relative reference (`tree_photos/<name>`).

use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors, Result};
use crate::models::PhotoUpload;

/// Directory under the media root that holds tree photos.
pub const PHOTO_DIR: &str = "tree_photos";

pub const EMPTY_PHOTO: &str = "The submitted file is empty.";
pub const NOT_AN_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `upload` and returns its reference relative to the media root.
    pub async fn save(&self, upload: &PhotoUpload) -> Result<String> {
        if upload.bytes.is_empty() {
            return Err(ApiError::Validation(FieldErrors::single("photo", EMPTY_PHOTO)));
        }
        if let Some(content_type) = &upload.content_type {
            if !content_type.to_ascii_lowercase().starts_with("image/") {
                return Err(ApiError::Validation(FieldErrors::single("photo", NOT_AN_IMAGE)));
            }
        }

        let reference = format!(
            "{}/{}_{}",
            PHOTO_DIR,
            Uuid::new_v4().simple(),
            sanitize_file_name(&upload.file_name)
        );
        let dir = self.root.join(PHOTO_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to create {}: {}", dir.display(), e)))?;
        let path = self.root.join(&reference);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(photo = %reference, bytes = upload.bytes.len(), "tree photo stored");
        Ok(reference)
    }

    /// Removes a stored photo whose entry was never written.
    pub async fn discard(&self, reference: &str) {
        let path = self.root.join(reference);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!(photo = %reference, error = %err, "failed to remove orphaned tree photo");
        }
    }
}

/// Keeps the last path component, restricted to a portable character set.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn upload(name: &str, content_type: Option<&str>, bytes: &'static [u8]) -> PhotoUpload {
        PhotoUpload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("oak.jpg"), "oak.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my oak.png"), "myoak.png");
        assert_eq!(sanitize_file_name(".."), "photo");
        assert_eq!(sanitize_file_name(""), "photo");
    }

    #[tokio::test]
    async fn test_save_writes_under_photo_dir() {
        let media = tempfile::tempdir().unwrap();
        let photos = PhotoStore::new(media.path());

        let reference = photos
            .save(&upload("oak.jpg", Some("image/jpeg"), b"jpeg-bytes"))
            .await
            .unwrap();

        assert!(reference.starts_with("tree_photos/"));
        assert!(reference.ends_with("_oak.jpg"));
        let written = tokio::fs::read(media.path().join(&reference)).await.unwrap();
        assert_eq!(written, b"jpeg-bytes");

        photos.discard(&reference).await;
        assert!(!media.path().join(&reference).exists());
    }

    #[tokio::test]
    async fn test_save_rejects_empty_and_non_image() {
        let media = tempfile::tempdir().unwrap();
        let photos = PhotoStore::new(media.path());

        match photos.save(&upload("oak.jpg", Some("image/jpeg"), b"")).await {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.messages("photo"), [EMPTY_PHOTO.to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        match photos.save(&upload("notes.txt", Some("text/plain"), b"hi")).await {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.messages("photo"), [NOT_AN_IMAGE.to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!media.path().join(PHOTO_DIR).exists());
    }
}
