use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CollectionPath, Document, DocumentPath, DocumentStore, FieldValue, Fields, StoreError};

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Fields>>;

/// In-process document store with the same per-call semantics as Firestore:
/// documents are listed in id order, patches merge top-level fields, and
/// patching a missing document fails.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections
    pub async fn len(&self) -> usize {
        self.collections.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.clone())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn fetch(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&path.parent())
            .and_then(|docs| docs.get(path.id()))
            .map(|fields| Document {
                id: path.id().to_string(),
                fields: fields.clone(),
            }))
    }

    async fn patch(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(&path.parent())
            .and_then(|docs| docs.get_mut(path.id()))
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        existing.extend(fields);
        Ok(())
    }

    async fn remove(&self, path: &DocumentPath) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(&path.parent()) {
            docs.remove(path.id());
        }
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_where(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: FieldValue,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.list(collection).await?;
        docs.retain(|doc| doc.fields.get(field) == Some(&value));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn insert_fetch_patch_remove() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes").unwrap();

        let id = store.insert(&notes, fields(&[("title", "a".into())])).await.unwrap();
        let path = notes.doc(&id).unwrap();

        store.patch(&path, fields(&[("content", "b".into())])).await.unwrap();
        let doc = store.fetch(&path).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.fields["title"].as_str(), Some("a"));
        assert_eq!(doc.fields["content"].as_str(), Some("b"));

        store.remove(&path).await.unwrap();
        assert!(store.fetch(&path).await.unwrap().is_none());
        // Second remove is silent, like the hosted store
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn patch_missing_document_fails() {
        let store = MemoryStore::new();
        let path = CollectionPath::root("notes").unwrap().doc("ghost").unwrap();
        let err = store.patch(&path, Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryStore::new();
        let root = CollectionPath::root("userTags").unwrap();
        let a = root.doc("alice").unwrap().collection("tags").unwrap();
        let b = root.doc("bob").unwrap().collection("tags").unwrap();

        store.insert(&a, fields(&[("name", "work".into())])).await.unwrap();
        assert_eq!(store.list(&a).await.unwrap().len(), 1);
        assert!(store.list(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_where_filters_by_equality() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes").unwrap();
        store.insert(&notes, fields(&[("owner_uid", "u1".into())])).await.unwrap();
        store.insert(&notes, fields(&[("owner_uid", "u2".into())])).await.unwrap();

        let owned = store.list_where(&notes, "owner_uid", "u1".into()).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].fields["owner_uid"].as_str(), Some("u1"));
    }
}
