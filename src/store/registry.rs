//! Concurrent document storage with per-document fine-grained locking.
//!
//! [`DocumentRegistry`] stores documents in a `HashMap` where each entry is
//! individually protected by a [`tokio::sync::RwLock`]. Reads of the same
//! document run concurrently, writes to different documents run
//! concurrently, and writes to one document are serialized.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{ActivationSerial, Event, EventId, User, UserId};
use crate::error::ApiError;

/// A value stored in a [`DocumentRegistry`], addressable by a key.
pub trait Document: Clone + Send + Sync + 'static {
    /// Primary key type.
    type Key: Clone + Eq + Hash + Display + Send + Sync;

    /// Returns this document's key.
    fn key(&self) -> Self::Key;
}

impl Document for User {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.id
    }
}

impl Document for Event {
    type Key = EventId;

    fn key(&self) -> EventId {
        self.id
    }
}

impl Document for ActivationSerial {
    type Key = String;

    fn key(&self) -> String {
        self.code.clone()
    }
}

/// Shared handle to a single locked document.
pub type DocumentLock<D> = Arc<RwLock<D>>;

/// In-memory collection of documents of one kind.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<RwLock<D>>` for per-document locking. Holding a document's write
/// lock for the whole read-modify-write cycle is what makes updates to a
/// single document atomic.
#[derive(Debug)]
pub struct DocumentRegistry<D: Document> {
    docs: RwLock<HashMap<D::Key, DocumentLock<D>>>,
}

impl<D: Document> DocumentRegistry<D> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a new document.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if a document with the same key
    /// already exists.
    pub async fn insert(&self, doc: D) -> Result<(), ApiError> {
        let key = doc.key();
        let mut map = self.docs.write().await;
        if map.contains_key(&key) {
            return Err(ApiError::Internal(format!("document {key} already exists")));
        }
        map.insert(key, Arc::new(RwLock::new(doc)));
        Ok(())
    }

    /// Inserts or replaces a document. Used when loading from persistence.
    pub async fn put(&self, doc: D) {
        let key = doc.key();
        self.docs
            .write()
            .await
            .insert(key, Arc::new(RwLock::new(doc)));
    }

    /// Inserts `doc` unless its key is already present. Returns `true` if
    /// it was inserted.
    pub async fn insert_if_absent(&self, doc: D) -> bool {
        let key = doc.key();
        let mut map = self.docs.write().await;
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, Arc::new(RwLock::new(doc)));
        true
    }

    /// Returns `true` while `entry` is still the registered handle for
    /// `key`. A handle taken before a removal or replacement is stale.
    pub async fn is_current(&self, key: &D::Key, entry: &DocumentLock<D>) -> bool {
        self.docs
            .read()
            .await
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    /// Removes `key` only if it still maps to `entry`.
    pub async fn remove_entry(&self, key: &D::Key, entry: &DocumentLock<D>) -> bool {
        let mut map = self.docs.write().await;
        let current = map.get(key).is_some_and(|c| Arc::ptr_eq(c, entry));
        if current {
            map.remove(key);
        }
        current
    }

    /// Returns the lock guarding the document, if present.
    pub async fn lock(&self, key: &D::Key) -> Option<DocumentLock<D>> {
        self.docs.read().await.get(key).cloned()
    }

    /// Returns a snapshot copy of the document, if present.
    pub async fn get(&self, key: &D::Key) -> Option<D> {
        let entry = self.lock(key).await?;
        let doc = entry.read().await;
        Some(doc.clone())
    }

    /// Removes a document, returning `true` if it existed.
    pub async fn remove(&self, key: &D::Key) -> bool {
        self.docs.write().await.remove(key).is_some()
    }

    /// Returns snapshot copies of every document matching `predicate`.
    pub async fn filter<F>(&self, mut predicate: F) -> Vec<D>
    where
        F: FnMut(&D) -> bool,
    {
        // The map lock must not be held while awaiting entry locks.
        let entries: Vec<DocumentLock<D>> = self.docs.read().await.values().cloned().collect();
        let mut matched = Vec::new();
        for entry in &entries {
            let doc = entry.read().await;
            if predicate(&doc) {
                matched.push(doc.clone());
            }
        }
        matched
    }

    /// Returns the number of documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// Returns `true` if the registry holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

impl<D: Document> Default for DocumentRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
