use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::{internal, ServiceError};
use crate::models::{Tag, TagCreate, TagUpdate};
use crate::store::{CollectionPath, DocumentPath, DocumentStore, StoreError};

const USER_TAGS_COLLECTION: &str = "userTags";
const TAGS_SUBCOLLECTION: &str = "tags";

/// Tags live under `userTags/{uid}/tags`; no owner comparison is needed
/// because the path itself belongs to the caller.
#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn DocumentStore>,
}

impl TagService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn collection(uid: &str) -> Result<CollectionPath, StoreError> {
        CollectionPath::root(USER_TAGS_COLLECTION)?
            .doc(uid)?
            .collection(TAGS_SUBCOLLECTION)
    }

    async fn load(&self, uid: &str, tag_id: &str, action: &str) -> Result<(DocumentPath, Tag), ServiceError> {
        let collection = Self::collection(uid).map_err(|e| internal(action, uid, e))?;
        let not_found = || {
            warn!("Tag {} not found for user {}", tag_id, uid);
            ServiceError::not_found("Tag", tag_id)
        };

        let path = collection.doc(tag_id).map_err(|_| not_found())?;
        let doc = self
            .store
            .fetch(&path)
            .await
            .map_err(|e| internal(action, uid, e))?
            .ok_or_else(not_found)?;
        let tag = Tag::from_document(doc).map_err(|e| internal(action, uid, e))?;
        Ok((path, tag))
    }

    pub async fn create(&self, uid: &str, input: TagCreate) -> Result<Tag, ServiceError> {
        let collection = Self::collection(uid).map_err(|e| internal("create tag", uid, e))?;
        let mut tag = Tag {
            id: String::new(),
            name: input.name,
            created_at: Utc::now(),
        };
        tag.id = self
            .store
            .insert(&collection, tag.to_fields())
            .await
            .map_err(|e| internal("create tag", uid, e))?;

        info!("Created new tag {} for user: {}", tag.id, uid);
        Ok(tag)
    }

    pub async fn list(&self, uid: &str) -> Result<Vec<Tag>, ServiceError> {
        let collection = Self::collection(uid).map_err(|e| internal("retrieve tags", uid, e))?;
        let docs = self
            .store
            .list(&collection)
            .await
            .map_err(|e| internal("retrieve tags", uid, e))?;

        let tags: Vec<Tag> = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                Tag::from_document(doc)
                    .map_err(|e| warn!("Skipping unreadable tag {} for user {}: {}", id, uid, e))
                    .ok()
            })
            .collect();

        info!("Retrieved {} tags for user: {}", tags.len(), uid);
        Ok(tags)
    }

    pub async fn get(&self, uid: &str, tag_id: &str) -> Result<Tag, ServiceError> {
        let (_, tag) = self.load(uid, tag_id, "retrieve tag").await?;
        Ok(tag)
    }

    pub async fn update(&self, uid: &str, tag_id: &str, input: TagUpdate) -> Result<Tag, ServiceError> {
        let (path, mut tag) = self.load(uid, tag_id, "update tag").await?;

        let fields = input.present_fields();
        if fields.is_empty() {
            return Err(ServiceError::no_fields_to_update());
        }

        match self.store.patch(&path, fields.clone()).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => return Err(ServiceError::not_found("Tag", tag_id)),
            Err(e) => return Err(internal("update tag", uid, e)),
        }
        tag.apply(&fields);

        info!("Updated tag {} for user: {}", tag_id, uid);
        Ok(tag)
    }

    pub async fn delete(&self, uid: &str, tag_id: &str) -> Result<(), ServiceError> {
        let (path, _) = self.load(uid, tag_id, "delete tag").await?;
        self.store
            .remove(&path)
            .await
            .map_err(|e| internal("delete tag", uid, e))?;
        info!("Deleted tag {} for user: {}", tag_id, uid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FailingStore;
    use crate::store::MemoryStore;

    fn service() -> TagService {
        TagService::new(Arc::new(MemoryStore::new()))
    }

    fn body(name: &str) -> TagCreate {
        TagCreate { name: name.into() }
    }

    #[tokio::test]
    async fn tags_are_scoped_per_owner() {
        let tags = service();
        let work = tags.create("alice", body("work")).await.unwrap();
        tags.create("bob", body("home")).await.unwrap();

        let alice = tags.list("alice").await.unwrap();
        assert_eq!(alice, vec![work.clone()]);
        assert!(matches!(
            tags.get("bob", &work.id).await,
            Err(ServiceError::NotFound { resource: "Tag", .. })
        ));
    }

    #[tokio::test]
    async fn rename_and_empty_update() {
        let tags = service();
        let tag = tags.create("alice", body("work")).await.unwrap();

        let renamed = tags
            .update("alice", &tag.id, TagUpdate { name: Some("office".into()) })
            .await
            .unwrap();
        assert_eq!(renamed.name, "office");
        assert_eq!(renamed.created_at, tag.created_at);

        let err = tags.update("alice", &tag.id, TagUpdate::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let tags = service();
        let tag = tags.create("alice", body("work")).await.unwrap();
        tags.delete("alice", &tag.id).await.unwrap();
        assert!(matches!(
            tags.delete("alice", &tag.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        let tags = TagService::new(Arc::new(FailingStore));
        match tags.list("alice").await.unwrap_err() {
            ServiceError::Internal(msg) => assert_eq!(msg, "Failed to retrieve tags. Please try again."),
            other => panic!("expected Internal, got {:?}", other),
        }
    }
}
