pub mod note;
pub mod tag;

use serde::Serialize;

pub use note::{Note, NoteCreate, NoteUpdate};
pub use tag::{Tag, TagCreate, TagUpdate};

/// One field-level validation failure, rendered under
/// `details.validation_errors` in the error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind: kind.into(),
        }
    }
}

/// Shape constraints checked on request bodies before any service runs
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Length check in characters, not bytes
pub(crate) fn check_length(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(FieldError::new(
            field,
            format!("String should have at least {} character{}", min, if min == 1 { "" } else { "s" }),
            "string_too_short",
        ));
    }
    if let Some(max) = max {
        if len > max {
            errors.push(FieldError::new(
                field,
                format!("String should have at most {} characters", max),
                "string_too_long",
            ));
        }
    }
}

pub(crate) fn finish(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
