//! Display URLs for post images
//!
//! Blob content is exposed to the view layer through object URL handles
//! (`blob:sitelog/<uuid>`). Minting a handle pins the content in memory
//! until it is revoked, so every handle the cache hands out must be
//! released by the view that requested it, or it lives until shutdown.

use crate::config::OBJECT_URL_PREFIX;
use crate::storage::{BlobStore, ImageRef};
use std::collections::HashMap;
use uuid::Uuid;

/// Result of resolving an image for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayUrl {
    Ready(String),
    /// Content is missing; render a placeholder
    Unavailable,
}

impl DisplayUrl {
    pub fn url(&self) -> Option<&str> {
        match self {
            DisplayUrl::Ready(url) => Some(url.as_str()),
            DisplayUrl::Unavailable => None,
        }
    }
}

/// Registry of live object URL handles
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: HashMap<String, Vec<u8>>,
}

impl ObjectUrlRegistry {
    pub fn create(&mut self, content: Vec<u8>) -> String {
        let url = format!("{}{}", OBJECT_URL_PREFIX, Uuid::new_v4());
        self.live.insert(url.clone(), content);
        url
    }

    /// Returns false when the handle was not live
    pub fn revoke(&mut self, url: &str) -> bool {
        self.live.remove(url).is_some()
    }

    /// Read content back through a live handle
    pub fn fetch(&self, url: &str) -> Option<&[u8]> {
        self.live.get(url).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Maps blob identifiers to the object URL minted for them
pub struct DisplayUrlCache {
    blobs: BlobStore,
    urls: ObjectUrlRegistry,
    by_blob: HashMap<String, String>,
}

impl DisplayUrlCache {
    pub fn new(blobs: BlobStore) -> Self {
        Self {
            blobs,
            urls: ObjectUrlRegistry::default(),
            by_blob: HashMap::new(),
        }
    }

    /// Resolve an image reference to something the view can display.
    ///
    /// Inline data is already displayable and is returned as-is. Anything
    /// else is looked up in the blob store; failures become
    /// [`DisplayUrl::Unavailable`].
    pub async fn resolve(&mut self, image: &ImageRef) -> DisplayUrl {
        let key = match image {
            ImageRef::Inline(inline) => return DisplayUrl::Ready(inline.as_str().to_string()),
            ImageRef::Blob(id) | ImageRef::Unknown(id) => id,
        };

        if let Some(url) = self.by_blob.get(key) {
            return DisplayUrl::Ready(url.clone());
        }

        match self.blobs.get(key).await {
            Ok(content) => {
                let url = self.urls.create(content);
                tracing::debug!("Minted display URL for {}: {}", key, url);
                self.by_blob.insert(key.clone(), url.clone());
                DisplayUrl::Ready(url)
            }
            Err(e) => {
                tracing::warn!("Image {} unavailable: {}", key, e);
                DisplayUrl::Unavailable
            }
        }
    }

    /// Revoke the handle minted for `image`. Returns false if none was cached.
    pub fn release(&mut self, image: &ImageRef) -> bool {
        let Some(url) = self.by_blob.remove(image.as_str()) else {
            return false;
        };

        self.urls.revoke(&url);
        tracing::debug!("Released display URL for {}", image);
        true
    }

    /// Revoke every handle, returning how many were live
    pub fn release_all(&mut self) -> usize {
        let count = self.by_blob.len();
        for (_, url) in self.by_blob.drain() {
            self.urls.revoke(&url);
        }

        if count > 0 {
            tracing::debug!("Released {} display URLs", count);
        }
        count
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.by_blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_blob.is_empty()
    }
}
