use std::fmt;

use thiserror::Error;

/// Editable post field a validation failure is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Content,
    ScheduledFor,
}

impl PostField {
    pub fn as_str(self) -> &'static str {
        match self {
            PostField::Content => "content",
            PostField::ScheduledFor => "scheduled_for",
        }
    }
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("`{field}` failed validation: {message}")]
    Validation { field: PostField, message: String },
    #[error("post `{id}` violates lifecycle invariant: {message}")]
    Invariant { id: String, message: String },
}

impl DomainError {
    pub fn validation(field: PostField, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invariant(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invariant {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Field to highlight when the error is shown inline.
    pub fn field(&self) -> Option<PostField> {
        match self {
            DomainError::Validation { field, .. } => Some(*field),
            DomainError::Invariant { .. } => None,
        }
    }
}
