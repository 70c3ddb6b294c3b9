//! Template persistence over a secure key-value store.
//!
//! [`SecureStore`] is the minimal capability the platform has to provide
//! (get / set / delete of string values). [`TemplateStore`] layers the
//! enrollment template on top of it: one JSON array of floats under one key.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::types::{Embedding, NormalizedEmbedding};

/// Key the enrollment template is stored under.
pub const EMBEDDING_KEY: &str = "face_embedding";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encryption error on '{key}': {message}")]
    Crypto { key: String, message: String },
    #[error("failed to encode template: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("secure store unavailable: {0}")]
    Backend(String),
}

/// Secure key-value storage capability.
#[allow(async_fn_in_trait)]
pub trait SecureStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Deleting a missing key is not an error.
    async fn delete_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: SecureStore> SecureStore for &S {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value).await
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete_item(key).await
    }
}

/// Process-local store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl SecureStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

/// Owns the single enrollment template kept in a [`SecureStore`].
pub struct TemplateStore<S> {
    store: S,
    key: String,
}

impl<S: SecureStore> TemplateStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            key: EMBEDDING_KEY.to_string(),
        }
    }

    /// Scope the template to a user identity (`face_embedding.<user>`).
    pub fn for_user(store: S, user: &str) -> Self {
        Self {
            store,
            key: format!("{EMBEDDING_KEY}.{user}"),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Read the template.
    ///
    /// A payload that does not parse, or that parses to a degenerate vector,
    /// counts as "not enrolled". Store I/O failures are returned.
    pub async fn load(&self) -> CoreResult<Option<NormalizedEmbedding>> {
        let Some(raw) = self.store.get_item(&self.key).await? else {
            tracing::debug!(key = %self.key, "no template stored");
            return Ok(None);
        };

        let embedding: Embedding = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "stored template unreadable; treating as absent"
                );
                return Ok(None);
            }
        };

        match embedding.normalize() {
            Ok(template) => {
                tracing::debug!(key = %self.key, dim = template.dim(), "template loaded");
                Ok(Some(template))
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "stored template degenerate; treating as absent"
                );
                Ok(None)
            }
        }
    }

    /// Normalize (if needed) and persist, replacing any previous template.
    pub async fn save(&self, embedding: &Embedding) -> CoreResult<NormalizedEmbedding> {
        let template = embedding.normalize()?;
        let payload = serde_json::to_string(&template).map_err(StorageError::from)?;
        self.store.set_item(&self.key, &payload).await?;
        tracing::debug!(key = %self.key, dim = template.dim(), "template saved");
        Ok(template)
    }

    /// Remove the template. Idempotent.
    pub async fn clear(&self) -> CoreResult<()> {
        self.store.delete_item(&self.key).await?;
        tracing::debug!(key = %self.key, "template cleared");
        Ok(())
    }

    pub async fn exists(&self) -> CoreResult<bool> {
        Ok(self.load().await?.is_some())
    }
}
