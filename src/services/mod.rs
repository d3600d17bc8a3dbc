//! Resource services: ownership scoping, validation of partial updates, and
//! translation between stored documents and response shapes.
//!
//! Every operation runs `Authenticated -> {NotFound | Forbidden | ValidationFailed | Applied}`.
//! Store failures are logged here with their cause and surface to callers
//! only as [`ServiceError::Internal`] with a generic message.

pub mod notes;
pub mod tags;

use thiserror::Error;
use tracing::error;

use crate::models::FieldError;
use crate::store::StoreError;

pub use notes::NoteService;
pub use tags::TagService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{resource} not found with ID: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn no_fields_to_update() -> Self {
        ServiceError::Validation {
            message: "No fields to update".to_string(),
            details: Vec::new(),
        }
    }
}

/// Log a store failure and replace it with a client-safe message
pub(crate) fn internal(action: &str, uid: &str, err: StoreError) -> ServiceError {
    error!("Failed to {} for user {}. Error: {}", action, uid, err);
    ServiceError::Internal(format!("Failed to {}. Please try again.", action))
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;

    use crate::store::{
        CollectionPath, Document, DocumentPath, DocumentStore, FieldValue, Fields, MemoryStore, StoreError,
    };

    /// Store whose every call fails, for exercising the internal-error path
    pub struct FailingStore;

    fn outage() -> StoreError {
        StoreError::Status {
            status: 503,
            message: "backend unavailable: connection reset by 10.0.0.7".into(),
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn insert(&self, _: &CollectionPath, _: Fields) -> Result<String, StoreError> {
            Err(outage())
        }
        async fn fetch(&self, _: &DocumentPath) -> Result<Option<Document>, StoreError> {
            Err(outage())
        }
        async fn patch(&self, _: &DocumentPath, _: Fields) -> Result<(), StoreError> {
            Err(outage())
        }
        async fn remove(&self, _: &DocumentPath) -> Result<(), StoreError> {
            Err(outage())
        }
        async fn list(&self, _: &CollectionPath) -> Result<Vec<Document>, StoreError> {
            Err(outage())
        }
        async fn list_where(&self, _: &CollectionPath, _: &str, _: FieldValue) -> Result<Vec<Document>, StoreError> {
            Err(outage())
        }
    }

    /// Reads go to the wrapped store; every patch fails
    pub struct PatchFailingStore(pub MemoryStore);

    #[async_trait]
    impl DocumentStore for PatchFailingStore {
        async fn insert(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
            self.0.insert(collection, fields).await
        }
        async fn fetch(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
            self.0.fetch(path).await
        }
        async fn patch(&self, _: &DocumentPath, _: Fields) -> Result<(), StoreError> {
            Err(outage())
        }
        async fn remove(&self, path: &DocumentPath) -> Result<(), StoreError> {
            self.0.remove(path).await
        }
        async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
            self.0.list(collection).await
        }
        async fn list_where(
            &self,
            collection: &CollectionPath,
            field: &str,
            value: FieldValue,
        ) -> Result<Vec<Document>, StoreError> {
            self.0.list_where(collection, field, value).await
        }
    }
}
