//! Gallery error taxonomy
//!
//! Every provider call made on behalf of a user action is wrapped in one of
//! these. The `Display` text is what the user sees in the failure toast;
//! the provider's own message stays available as the error source.

use thiserror::Error;

use crate::backend::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalleryError {
    /// Credential or validation failure, already mapped to user-facing text
    #[error("{0}")]
    Auth(String),

    #[error("Failed to load media")]
    StorageList(#[source] ProviderError),

    #[error("Failed to upload file")]
    StorageUpload(#[source] ProviderError),

    #[error("Failed to delete file")]
    StorageDelete(#[source] ProviderError),
}

impl GalleryError {
    /// The underlying provider failure, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            GalleryError::Auth(_) => None,
            GalleryError::StorageList(e)
            | GalleryError::StorageUpload(e)
            | GalleryError::StorageDelete(e) => Some(e),
        }
    }
}
