//! Image storage boundary
//!
//! The catalog and profiles only keep references to stored images. The
//! bundled [`LocalImageStore`] writes files to a directory that the HTTP
//! layer serves under a public URL prefix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

/// An uploaded image awaiting storage
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Accept jpeg/jpg/png only (both extension and MIME type) up to 1MB
    pub fn validate(&self) -> AppResult<()> {
        let extension_ok = self
            .extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        let mime_ok = matches!(
            self.content_type.to_lowercase().as_str(),
            "image/jpeg" | "image/jpg" | "image/png"
        );
        if !extension_ok || !mime_ok {
            return Err(AppError::Validation(format!(
                "{}: images only (jpeg, jpg, png)",
                self.file_name
            )));
        }
        if self.bytes.is_empty() {
            return Err(AppError::Validation(format!("{}: empty file", self.file_name)));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "{}: file exceeds the 1MB limit",
                self.file_name
            )));
        }
        Ok(())
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return the reference to store
    async fn store(&self, image: ImageUpload) -> AppResult<String>;

    /// Remove a previously stored image; unknown references are ignored
    async fn remove(&self, reference: &str) -> AppResult<()>;
}

/// Stores images as files named by random UUID
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a reference we issued; `None` for anything else
    fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(&self.public_url)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.dir.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, image: ImageUpload) -> AppResult<String> {
        image.validate()?;

        let extension = image.extension().unwrap_or_else(|| "jpg".to_string());
        let name = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;
        tokio::fs::write(self.dir.join(&name), &image.bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write image: {}", e)))?;

        tracing::debug!("Stored image {} ({} bytes)", name, image.bytes.len());
        Ok(format!("{}/{}", self.public_url, name))
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        let Some(path) = self.path_for(reference) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!("Failed to remove image: {}", e))),
        }
    }
}
