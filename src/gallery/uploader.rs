//! Drop-target uploader
//!
//! Takes the first file of a drop, renames it to a random key that keeps
//! the original extension, and stores it. Files outside the accepted
//! extensions never reach storage.

use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::StorageProvider;
use crate::error::GalleryError;
use crate::gallery::media::{content_type, extension, AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::notify::Notifier;

pub const MSG_UPLOADED: &str = "File uploaded successfully!";

/// A file handed to the drop target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub data: Bytes,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk
    pub async fn read(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Not a file path: {:?}", path))?
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Self::new(name, data))
    }
}

/// What a drop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored under the given key
    Uploaded { key: String },
    /// Refused by the drop target's extension filter
    Rejected { name: String },
    /// Nothing was dropped
    Empty,
}

/// Whether the drop target accepts a file name
pub fn accepts(name: &str) -> bool {
    extension(name).is_some_and(|ext| {
        let ext = ext.as_str();
        IMAGE_EXTENSIONS.contains(&ext) || VIDEO_EXTENSIONS.contains(&ext) || AUDIO_EXTENSIONS.contains(&ext)
    })
}

/// Random storage key keeping the original extension as written
pub fn storage_key(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext),
        _ => Uuid::new_v4().to_string(),
    }
}

type CompletionCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub struct Uploader {
    storage: Arc<dyn StorageProvider>,
    notifier: Arc<dyn Notifier>,
    on_complete: CompletionCallback,
}

impl Uploader {
    /// `on_complete` receives the new key after every successful upload
    pub fn new<F>(storage: Arc<dyn StorageProvider>, notifier: Arc<dyn Notifier>, on_complete: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            storage,
            notifier,
            on_complete: Arc::new(on_complete),
        }
    }

    /// Handle a drop or selection
    pub async fn drop_files(&self, files: Vec<DroppedFile>) -> Result<UploadOutcome, GalleryError> {
        let mut files = files.into_iter();
        let Some(file) = files.next() else {
            return Ok(UploadOutcome::Empty);
        };
        let ignored = files.count();
        if ignored > 0 {
            tracing::debug!("Ignoring {} extra dropped files", ignored);
        }

        if !accepts(&file.name) {
            tracing::warn!("Drop target rejected {}", file.name);
            return Ok(UploadOutcome::Rejected { name: file.name });
        }

        let key = storage_key(&file.name);
        let size = file.data.len();
        tracing::info!("Uploading {} as {} ({} bytes)", file.name, key, size);

        if let Err(e) = self
            .storage
            .upload(&key, file.data, content_type(&file.name))
            .await
        {
            tracing::error!("Error uploading file {}: {}", file.name, e);
            let err = GalleryError::StorageUpload(e);
            self.notifier.error(&err.to_string());
            return Err(err);
        }

        self.notifier.success(MSG_UPLOADED);
        (self.on_complete)(&key);
        Ok(UploadOutcome::Uploaded { key })
    }
}
