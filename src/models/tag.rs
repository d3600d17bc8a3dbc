use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, finish, FieldError, Validate};
use crate::store::{Document, FieldValue, Fields, StoreError};

pub const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagUpdate {
    pub name: Option<String>,
}

impl Validate for TagCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "body -> name", &self.name, 1, Some(NAME_MAX_CHARS));
        finish(errors)
    }
}

impl Validate for TagUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_length(&mut errors, "body -> name", name, 1, Some(NAME_MAX_CHARS));
        }
        finish(errors)
    }
}

impl TagUpdate {
    pub fn present_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(name) = &self.name {
            fields.insert("name".into(), name.clone().into());
        }
        fields
    }
}

impl Tag {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), self.name.clone().into());
        fields.insert("created_at".into(), self.created_at.into());
        fields
    }

    pub fn apply(&mut self, fields: &Fields) {
        if let Some(FieldValue::String(name)) = fields.get("name") {
            self.name = name.clone();
        }
    }

    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let name = doc
            .fields
            .get("name")
            .and_then(FieldValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode(format!("tag {} has no name", doc.id)))?;
        let created_at = doc
            .fields
            .get("created_at")
            .and_then(FieldValue::as_timestamp)
            .ok_or_else(|| StoreError::Decode(format!("tag {} has no created_at", doc.id)))?;
        Ok(Self {
            id: doc.id,
            name,
            created_at,
        })
    }
}
