//! Document store gateway.
//!
//! Every resource family talks to the backing store through [`DocumentStore`],
//! addressed by hierarchical paths of the form
//! `collection/document/collection/document/...`. Each call is a single
//! remote request; there are no cross-document transactions and no version
//! checks, so concurrent writers to one document resolve last-writer-wins.

pub mod firestore;
pub mod memory;
pub mod value;

use async_trait::async_trait;
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use value::{FieldValue, Fields};

/// Errors from a store backend. These never reach clients directly.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid path segment: {0:?}")]
    InvalidSegment(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Store responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed store response: {0}")]
    Decode(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A stored document: its id (last path segment) and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Path to a collection: an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Path to a single document: an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

fn check_segment(segment: &str) -> Result<(), StoreError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('/') {
        return Err(StoreError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

impl CollectionPath {
    /// Top-level collection
    pub fn root(name: &str) -> Result<Self, StoreError> {
        check_segment(name)?;
        Ok(Self {
            segments: vec![name.to_string()],
        })
    }

    /// Address a document inside this collection
    pub fn doc(&self, id: &str) -> Result<DocumentPath, StoreError> {
        check_segment(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocumentPath { segments })
    }

    /// Last segment, e.g. `tags` for `userTags/u1/tags`
    pub fn collection_id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Document containing this collection, `None` for top-level collections
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() < 3 {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl DocumentPath {
    /// Address a subcollection under this document
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StoreError> {
        check_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(CollectionPath { segments })
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Collection holding this document
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// CRUD primitives over hierarchical documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id and return that id
    async fn insert(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError>;

    async fn fetch(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Merge `fields` into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn patch(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn remove(&self, path: &DocumentPath) -> Result<(), StoreError>;

    /// Every document directly inside `collection`, in store order
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Documents in `collection` whose `field` equals `value`
    async fn list_where(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: FieldValue,
    ) -> Result<Vec<Document>, StoreError>;
}
