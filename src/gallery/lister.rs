//! Gallery listing and deletion
//!
//! The listing is the only shared mutable state in the gallery. It is
//! rebuilt wholesale on every load and only shrinks locally after a
//! confirmed delete; there is no re-fetch after a delete.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::StorageProvider;
use crate::error::GalleryError;
use crate::gallery::lifetime::Lifetime;
use crate::gallery::media::MediaItem;
use crate::notify::Notifier;

pub const MSG_DELETED: &str = "File deleted successfully";

pub struct Gallery {
    storage: Arc<dyn StorageProvider>,
    notifier: Arc<dyn Notifier>,
    items: Mutex<Vec<MediaItem>>,
    lifetime: Lifetime,
}

impl Gallery {
    /// Create the gallery and run its initial load
    pub async fn mount(storage: Arc<dyn StorageProvider>, notifier: Arc<dyn Notifier>) -> Self {
        let gallery = Self::new(storage, notifier);
        // Failures are already logged and toasted
        let _ = gallery.load().await;
        gallery
    }

    /// Create an empty, unloaded gallery
    pub fn new(storage: Arc<dyn StorageProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            items: Mutex::new(Vec::new()),
            lifetime: Lifetime::new(),
        }
    }

    /// Replace the listing with a full fetch. Returns the item count.
    pub async fn load(&self) -> Result<usize, GalleryError> {
        let objects = match self.storage.list().await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::error!("Error loading media: {}", e);
                let err = GalleryError::StorageList(e);
                if !self.lifetime.is_ended() {
                    self.notifier.error(&err.to_string());
                }
                return Err(err);
            }
        };

        let items: Vec<MediaItem> = objects
            .into_iter()
            .map(|object| {
                let url = self.storage.public_url(&object.name);
                MediaItem::from_object(object, url)
            })
            .collect();

        if self.lifetime.is_ended() {
            tracing::debug!("Dropping listing that arrived after unmount");
            return Ok(0);
        }

        let count = items.len();
        *self.items.lock().await = items;
        tracing::info!("Loaded {} media items", count);
        Ok(count)
    }

    /// Remove one object, then drop it from the listing
    pub async fn delete(&self, name: &str) -> Result<(), GalleryError> {
        if let Err(e) = self.storage.remove(&[name.to_string()]).await {
            tracing::error!("Error deleting file {}: {}", name, e);
            let err = GalleryError::StorageDelete(e);
            if !self.lifetime.is_ended() {
                self.notifier.error(&err.to_string());
            }
            return Err(err);
        }

        if self.lifetime.is_ended() {
            tracing::debug!("Delete of {} confirmed after unmount", name);
            return Ok(());
        }

        self.items.lock().await.retain(|item| item.name != name);
        tracing::info!("Deleted {}", name);
        self.notifier.success(MSG_DELETED);
        Ok(())
    }

    /// Snapshot of the listing
    pub async fn items(&self) -> Vec<MediaItem> {
        self.items.lock().await.clone()
    }

    pub async fn find(&self, name: &str) -> Option<MediaItem> {
        self.items.lock().await.iter().find(|item| item.name == name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Stop accepting results from in-flight requests
    pub fn unmount(&self) {
        self.lifetime.end();
    }

    pub fn is_mounted(&self) -> bool {
        !self.lifetime.is_ended()
    }
}
