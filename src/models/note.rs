use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, finish, FieldError, Validate};
use crate::store::{Document, FieldValue, Fields, StoreError};

pub const TITLE_MAX_CHARS: usize = 100;

/// Canonical note representation, as stored and as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub owner_uid: String,
    pub is_favorite: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// POST body. Any owner field a client sends is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteCreate {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

/// PUT body: every field optional, only present fields are written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_favorite: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl Validate for NoteCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "body -> title", &self.title, 1, Some(TITLE_MAX_CHARS));
        check_length(&mut errors, "body -> content", &self.content, 1, None);
        finish(errors)
    }
}

impl Validate for NoteUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_length(&mut errors, "body -> title", title, 1, Some(TITLE_MAX_CHARS));
        }
        if let Some(content) = &self.content {
            check_length(&mut errors, "body -> content", content, 1, None);
        }
        finish(errors)
    }
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.is_favorite.is_none() && self.tags.is_none()
    }

    /// Fields explicitly present in the request, ready to patch.
    /// Tag references are de-duplicated keeping first occurrence.
    pub fn present_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(title) = &self.title {
            fields.insert("title".into(), title.clone().into());
        }
        if let Some(content) = &self.content {
            fields.insert("content".into(), content.clone().into());
        }
        if let Some(is_favorite) = self.is_favorite {
            fields.insert("is_favorite".into(), is_favorite.into());
        }
        if let Some(tags) = &self.tags {
            fields.insert("tags".into(), dedup_tags(tags).into());
        }
        fields
    }

    /// Whether applying this update to `note` changes its title or content
    pub fn changes_content_of(&self, note: &Note) -> bool {
        self.title.as_ref().is_some_and(|t| *t != note.title)
            || self.content.as_ref().is_some_and(|c| *c != note.content)
    }
}

fn dedup_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

impl Note {
    /// Stored fields; the id lives in the document path
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("content".into(), self.content.clone().into());
        fields.insert("owner_uid".into(), self.owner_uid.clone().into());
        fields.insert("is_favorite".into(), self.is_favorite.into());
        fields.insert("tags".into(), self.tags.clone().into());
        fields.insert("created_at".into(), self.created_at.into());
        fields.insert("updated_at".into(), self.updated_at.into());
        fields
    }

    /// Overlay patched fields onto this note, as the store does
    pub fn apply(&mut self, fields: &Fields) {
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("title", FieldValue::String(s)) => self.title = s.clone(),
                ("content", FieldValue::String(s)) => self.content = s.clone(),
                ("is_favorite", FieldValue::Bool(b)) => self.is_favorite = *b,
                ("tags", v @ FieldValue::Array(_)) => self.tags = v.as_string_array().unwrap_or_default(),
                ("updated_at", FieldValue::Timestamp(ts)) => self.updated_at = *ts,
                _ => {}
            }
        }
    }

    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let fields = &doc.fields;
        let text = |name: &str| {
            fields
                .get(name)
                .and_then(FieldValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| StoreError::Decode(format!("note {} has no {}", doc.id, name)))
        };

        let title = text("title")?;
        let content = text("content")?;
        let owner_uid = text("owner_uid")?;
        let created_at = fields
            .get("created_at")
            .and_then(FieldValue::as_timestamp)
            .ok_or_else(|| StoreError::Decode(format!("note {} has no created_at", doc.id)))?;
        // Older documents predate these fields
        let updated_at = fields
            .get("updated_at")
            .and_then(FieldValue::as_timestamp)
            .unwrap_or(created_at);
        let is_favorite = fields.get("is_favorite").and_then(FieldValue::as_bool).unwrap_or(false);
        let tags = fields
            .get("tags")
            .and_then(FieldValue::as_string_array)
            .unwrap_or_default();

        Ok(Self {
            id: doc.id,
            title,
            content,
            owner_uid,
            is_favorite,
            tags,
            created_at,
            updated_at,
        })
    }
}
