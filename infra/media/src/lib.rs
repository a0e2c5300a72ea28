//! # Media storage
//!
//! Stores uploaded images outside the database and hands back a delivery URL.
//!
//! * [`Cloudinary`]: signed uploads to the Cloudinary REST API.
//! * in-memory: keeps bytes in the process, for development and tests.
//! * disabled: every operation fails with [`MediaError::NotConfigured`].
//!
//! ```rust
//! # use quill_media::Media;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), quill_media::MediaError> {
//! let media = Media::memory("images");
//! let image = media.upload("cover.png", vec![0x89, b'P', b'N', b'G']).await?;
//! assert!(image.name.starts_with("images/cover"));
//! media.destroy(&image.name).await?;
//! # Ok(())
//! # }
//! ```

mod cloudinary;
mod error;

pub use cloudinary::{Cloudinary, sign};
pub use error::{MediaError, MediaErrorExt};

use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// Where an uploaded image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Provider-side identifier, used to delete the image later.
    pub name: String,
    pub url: String,
}

/// Shared handle to the configured backend.
#[derive(Debug, Clone)]
pub struct Media {
    backend: Arc<MediaBackend>,
}

#[derive(Debug)]
pub enum MediaBackend {
    Cloudinary(Cloudinary),
    Memory(MemoryStore),
    Disabled,
}

impl Media {
    #[must_use]
    pub fn new(backend: MediaBackend) -> Self {
        Self { backend: Arc::new(backend) }
    }

    #[must_use]
    pub fn cloudinary(client: Cloudinary) -> Self {
        Self::new(MediaBackend::Cloudinary(client))
    }

    #[must_use]
    pub fn memory(folder: impl Into<String>) -> Self {
        Self::new(MediaBackend::Memory(MemoryStore::new(folder)))
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(MediaBackend::Disabled)
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !matches!(*self.backend, MediaBackend::Disabled)
    }

    /// Short backend name for logs and health output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match &*self.backend {
            MediaBackend::Cloudinary(_) => "cloudinary",
            MediaBackend::Memory(_) => "memory",
            MediaBackend::Disabled => "disabled",
        }
    }

    /// Stores `bytes` under a name derived from `filename`.
    ///
    /// # Errors
    /// * [`MediaError::InvalidInput`] for an empty body or file name.
    /// * [`MediaError::NotConfigured`] when storage is disabled.
    /// * [`MediaError::Rejected`] / [`MediaError::Transport`] for provider failures.
    #[instrument(skip(self, bytes), fields(backend = self.kind(), size = bytes.len()))]
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<StoredImage, MediaError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(MediaError::InvalidInput {
                message: "file name is required".into(),
                context: None,
            });
        }
        if bytes.is_empty() {
            return Err(MediaError::InvalidInput {
                message: "the uploaded file is empty".into(),
                context: Some(filename.to_owned().into()),
            });
        }

        match &*self.backend {
            MediaBackend::Cloudinary(client) => client.upload(filename, bytes).await,
            MediaBackend::Memory(store) => Ok(store.put(filename, bytes)),
            MediaBackend::Disabled => Err(MediaError::NotConfigured { context: None }),
        }
    }

    /// Deletes a previously stored image; unknown names are not an error.
    ///
    /// # Errors
    /// * [`MediaError::NotConfigured`] when storage is disabled.
    /// * [`MediaError::Rejected`] / [`MediaError::Transport`] for provider failures.
    #[instrument(skip(self), fields(backend = self.kind()))]
    pub async fn destroy(&self, name: &str) -> Result<(), MediaError> {
        match &*self.backend {
            MediaBackend::Cloudinary(client) => client.destroy(name).await,
            MediaBackend::Memory(store) => {
                store.remove(name);
                Ok(())
            }
            MediaBackend::Disabled => Err(MediaError::NotConfigured { context: None }),
        }
    }
}

/// Process-local image store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    folder: String,
    next_id: AtomicU64,
    files: RwLock<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new(folder: impl Into<String>) -> Self {
        Self { folder: folder.into(), ..Self::default() }
    }

    fn put(&self, filename: &str, bytes: Vec<u8>) -> StoredImage {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
        let stem: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        let name = if self.folder.is_empty() {
            format!("{stem}_{id}")
        } else {
            format!("{}/{stem}_{id}", self.folder)
        };
        debug!(%name, "Storing image in memory");
        self.files.write().insert(name.clone(), bytes);

        StoredImage { url: format!("memory://{name}"), name }
    }

    fn remove(&self, name: &str) -> Option<Vec<u8>> {
        self.files.write().remove(name)
    }

    /// Bytes stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl Media {
    /// The in-memory store, when that backend is active.
    #[must_use]
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &*self.backend {
            MediaBackend::Memory(store) => Some(store),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_round_trips_bytes() {
        let media = Media::memory("images");
        let image = media.upload("My Cover.png", b"png".to_vec()).await.expect("upload");
        assert_eq!(image.name, "images/My_Cover_0");
        assert_eq!(image.url, "memory://images/My_Cover_0");

        let store = media.memory_store().expect("memory backend");
        assert_eq!(store.get(&image.name).as_deref(), Some(&b"png"[..]));

        media.destroy(&image.name).await.expect("destroy");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn disabled_backend_reports_not_configured() {
        let media = Media::disabled();
        assert!(!media.is_configured());
        let err = media.upload("a.png", vec![1]).await.unwrap_err();
        assert!(matches!(err, MediaError::NotConfigured { .. }));
        assert_eq!(err.to_string(), "Media storage not configured");
    }

    #[tokio::test]
    async fn empty_uploads_are_rejected() {
        let media = Media::memory("images");
        assert!(matches!(
            media.upload("a.png", Vec::new()).await,
            Err(MediaError::InvalidInput { .. })
        ));
        assert!(matches!(
            media.upload("  ", vec![1]).await,
            Err(MediaError::InvalidInput { .. })
        ));
    }
}
