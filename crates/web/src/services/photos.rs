//! Uploaded store photos.
//!
//! Raster photos are written as-is under the uploads directory with a random
//! file name; the store row keeps only that name.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload, in bytes.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Raster image subtypes accepted as photos, with the extension each is saved under.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpeg", "jpeg"),
    ("jpg", "jpeg"),
    ("pjpeg", "jpeg"),
    ("png", "png"),
    ("gif", "gif"),
    ("webp", "webp"),
];

/// Errors that can occur while accepting a photo.
#[derive(Debug, Error)]
pub enum PhotoError {
    /// The upload's content type is not an accepted raster image.
    #[error("that filetype isn't allowed: {0}")]
    NotAnImage(String),

    /// Writing the file failed.
    #[error("could not save photo: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received with the store form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// File extension for the upload, e.g. `jpeg` for `image/jpeg`.
    ///
    /// Only raster types are accepted. `image/svg+xml` is refused.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoError::NotAnImage`] for any other content type.
    pub fn extension(&self) -> Result<&'static str, PhotoError> {
        let mime = self.content_type.to_ascii_lowercase();
        // parameters after `;` are dropped
        let essence = mime.split(';').next().unwrap_or_default().trim();

        essence
            .strip_prefix("image/")
            .and_then(|subtype| {
                ALLOWED_TYPES
                    .iter()
                    .find(|(allowed, _)| *allowed == subtype)
                    .map(|&(_, ext)| ext)
            })
            .ok_or_else(|| PhotoError::NotAnImage(self.content_type.clone()))
    }
}

/// Writes photos into one directory.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save an upload and return its file name.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoError::NotAnImage`] before touching the disk, or
    /// [`PhotoError::Io`] if the directory or file cannot be written.
    pub async fn save(&self, upload: &PhotoUpload) -> Result<String, PhotoError> {
        let ext = upload.extension()?;
        let file_name = format!("{}.{ext}", Uuid::new_v4());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), &upload.bytes).await?;

        tracing::info!(photo = %file_name, bytes = upload.bytes.len(), "Saved store photo");
        Ok(file_name)
    }

    /// Remove a photo saved for a write that then failed.
    pub async fn discard(&self, file_name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            tracing::warn!(photo = %file_name, error = %e, "Could not remove orphaned photo");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(content_type: &str) -> PhotoUpload {
        PhotoUpload {
            content_type: content_type.to_owned(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[test]
    fn test_extension_from_mime_subtype() {
        assert_eq!(upload("image/jpeg").extension().unwrap(), "jpeg");
        assert_eq!(upload("image/jpg").extension().unwrap(), "jpeg");
        assert_eq!(upload("IMAGE/PNG").extension().unwrap(), "png");
        assert_eq!(upload("image/webp; q=1").extension().unwrap(), "webp");
    }

    #[test]
    fn test_scriptable_images_rejected() {
        for content_type in ["image/svg+xml", "image/svg", "image/x-icon", "image/tiff"] {
            assert!(
                matches!(upload(content_type).extension(), Err(PhotoError::NotAnImage(_))),
                "{content_type} should be refused"
            );
        }
    }

    #[tokio::test]
    async fn test_svg_upload_never_touches_disk() {
        let dir = std::env::temp_dir().join(format!("delicious-photos-{}", Uuid::new_v4()));
        let store = PhotoStore::new(&dir);

        let svg = PhotoUpload {
            content_type: "image/svg+xml".to_owned(),
            bytes: b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>"
                .to_vec(),
        };
        assert!(matches!(store.save(&svg).await, Err(PhotoError::NotAnImage(_))));
        assert!(!dir.exists());
    }

    #[test]
    fn test_non_images_rejected() {
        assert!(matches!(
            upload("application/pdf").extension(),
            Err(PhotoError::NotAnImage(_))
        ));
        assert!(matches!(
            upload("image/").extension(),
            Err(PhotoError::NotAnImage(_))
        ));
    }

    #[tokio::test]
    async fn test_save_writes_uuid_named_file() {
        let dir = std::env::temp_dir().join(format!("delicious-photos-{}", Uuid::new_v4()));
        let store = PhotoStore::new(&dir);

        let name = store.save(&upload("image/gif")).await.unwrap();
        assert!(name.ends_with(".gif"));
        assert_eq!(name.len(), 36 + ".gif".len());

        let written = tokio::fs::read(dir.join(&name)).await.unwrap();
        assert_eq!(written, vec![0xFF, 0xD8, 0xFF]);

        store.discard(&name).await;
        assert!(!dir.join(&name).exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
