use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::{internal, ServiceError};
use crate::config::NotesLayout;
use crate::models::{Note, NoteCreate, NoteUpdate};
use crate::store::{CollectionPath, DocumentPath, DocumentStore, FieldValue, Fields, StoreError};

const USER_NOTES_COLLECTION: &str = "userNotes";
const NOTES_SUBCOLLECTION: &str = "notes";
const FLAT_NOTES_COLLECTION: &str = "notes";

/// Owner-scoped note operations over a [`DocumentStore`]
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn DocumentStore>,
    layout: NotesLayout,
}

impl NoteService {
    pub fn new(store: Arc<dyn DocumentStore>, layout: NotesLayout) -> Self {
        Self { store, layout }
    }

    fn collection(&self, uid: &str) -> Result<CollectionPath, StoreError> {
        match self.layout {
            NotesLayout::Namespaced => CollectionPath::root(USER_NOTES_COLLECTION)?
                .doc(uid)?
                .collection(NOTES_SUBCOLLECTION),
            NotesLayout::Flat => CollectionPath::root(FLAT_NOTES_COLLECTION),
        }
    }

    /// Fetch a note the caller may act on.
    ///
    /// Namespaced: absence in the caller's namespace is the only failure.
    /// Flat: a note owned by someone else is `Forbidden`.
    async fn load(&self, uid: &str, note_id: &str, verb: &str) -> Result<(DocumentPath, Note), ServiceError> {
        let action = format!("{} note", verb);
        let collection = self.collection(uid).map_err(|e| internal(&action, uid, e))?;
        let path = match collection.doc(note_id) {
            Ok(path) => path,
            Err(_) => {
                warn!("Note {} not found for user {}", note_id, uid);
                return Err(ServiceError::not_found("Note", note_id));
            }
        };

        let doc = self
            .store
            .fetch(&path)
            .await
            .map_err(|e| internal(&action, uid, e))?
            .ok_or_else(|| {
                warn!("Note {} not found for user {}", note_id, uid);
                ServiceError::not_found("Note", note_id)
            })?;
        let note = Note::from_document(doc).map_err(|e| internal(&action, uid, e))?;

        if self.layout == NotesLayout::Flat && note.owner_uid != uid {
            warn!("User {} not authorized to {} note {}", uid, verb, note_id);
            return Err(ServiceError::Forbidden(format!(
                "You are not authorized to {} this note",
                verb
            )));
        }

        Ok((path, note))
    }

    /// Patch, mapping a document that vanished mid-request to NotFound
    async fn write(&self, uid: &str, path: &DocumentPath, fields: Fields, action: &str) -> Result<(), ServiceError> {
        match self.store.patch(path, fields).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(ServiceError::not_found("Note", path.id())),
            Err(e) => Err(internal(action, uid, e)),
        }
    }

    pub async fn create(&self, uid: &str, input: NoteCreate) -> Result<Note, ServiceError> {
        let collection = self.collection(uid).map_err(|e| internal("create note", uid, e))?;

        let now = Utc::now();
        let mut note = Note {
            id: String::new(),
            title: input.title,
            content: input.content,
            owner_uid: uid.to_string(),
            is_favorite: input.is_favorite.unwrap_or(false),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        note.id = self
            .store
            .insert(&collection, note.to_fields())
            .await
            .map_err(|e| internal("create note", uid, e))?;

        info!("Created new note {} for user: {}", note.id, uid);
        Ok(note)
    }

    /// All of the caller's notes, in store enumeration order
    pub async fn list(&self, uid: &str) -> Result<Vec<Note>, ServiceError> {
        let collection = self.collection(uid).map_err(|e| internal("retrieve notes", uid, e))?;
        let docs = match self.layout {
            NotesLayout::Namespaced => self.store.list(&collection).await,
            NotesLayout::Flat => {
                self.store
                    .list_where(&collection, "owner_uid", FieldValue::from(uid))
                    .await
            }
        }
        .map_err(|e| internal("retrieve notes", uid, e))?;

        let notes: Vec<Note> = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                Note::from_document(doc)
                    .map_err(|e| warn!("Skipping unreadable note {} for user {}: {}", id, uid, e))
                    .ok()
            })
            .collect();

        info!("Retrieved {} notes for user: {}", notes.len(), uid);
        Ok(notes)
    }

    pub async fn get(&self, uid: &str, note_id: &str) -> Result<Note, ServiceError> {
        let (_, note) = self.load(uid, note_id, "read").await?;
        info!("Retrieved note {} for user: {}", note_id, uid);
        Ok(note)
    }

    /// Apply the present fields of `input`. `updated_at` moves only when
    /// title or content actually change.
    pub async fn update(&self, uid: &str, note_id: &str, input: NoteUpdate) -> Result<Note, ServiceError> {
        let (path, mut note) = self.load(uid, note_id, "update").await?;

        if input.is_empty() {
            return Err(ServiceError::no_fields_to_update());
        }

        let mut fields = input.present_fields();
        if input.changes_content_of(&note) {
            fields.insert("updated_at".into(), Utc::now().into());
        }

        self.write(uid, &path, fields.clone(), "update note").await?;
        note.apply(&fields);

        info!("Updated note {} for user: {}", note_id, uid);
        Ok(note)
    }

    /// A second delete of the same id reports NotFound
    pub async fn delete(&self, uid: &str, note_id: &str) -> Result<(), ServiceError> {
        let (path, _) = self.load(uid, note_id, "delete").await?;
        self.store
            .remove(&path)
            .await
            .map_err(|e| internal("delete note", uid, e))?;
        info!("Deleted note {} for user: {}", note_id, uid);
        Ok(())
    }

    /// Flip `is_favorite`. Not idempotent: two calls restore the original value.
    pub async fn toggle_favorite(&self, uid: &str, note_id: &str) -> Result<Note, ServiceError> {
        let (path, mut note) = self.load(uid, note_id, "update").await?;

        let mut fields = Fields::new();
        fields.insert("is_favorite".into(), (!note.is_favorite).into());
        fields.insert("updated_at".into(), Utc::now().into());

        self.write(uid, &path, fields.clone(), "update note").await?;
        note.apply(&fields);

        info!("Toggled favorite on note {} to {} for user: {}", note_id, note.is_favorite, uid);
        Ok(note)
    }
}
