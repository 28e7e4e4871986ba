use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{
        calendar::{InvalidMonthKey, InvalidWeekStart},
        filter::InvalidStatusFilter,
        modal::ModalError,
        ports::ApiError,
    },
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
    util::timezone::LocalTimeError,
};

/// An error flattened into its message chain for logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Modal(#[from] ModalError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Month(#[from] InvalidMonthKey),
    #[error(transparent)]
    WeekStart(#[from] InvalidWeekStart),
    #[error(transparent)]
    StatusFilter(#[from] InvalidStatusFilter),
    #[error(transparent)]
    LocalTime(#[from] LocalTimeError),
    #[error("post `{0}` not found")]
    NotFound(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Infra(InfraError::ContentFile { .. }) => 66,
            AppError::Config(_) | AppError::Infra(_) => 78,
            AppError::Api(ApiError::Unauthorized) | AppError::Modal(ModalError::Unauthorized) => {
                77
            }
            AppError::Api(_)
            | AppError::Modal(ModalError::Save(_) | ModalError::Generation(_)) => 69,
            AppError::Modal(_)
            | AppError::Domain(_)
            | AppError::Month(_)
            | AppError::WeekStart(_)
            | AppError::StatusFilter(_)
            | AppError::LocalTime(_)
            | AppError::NotFound(_) => 65,
            AppError::Unexpected(_) => 70,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::PostField;

    #[test]
    fn report_walks_the_source_chain() {
        let err = AppError::from(ModalError::Save(ApiError::Status {
            status: 503,
            body: "down".into(),
        }));
        let report = err.report();
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[1].contains("503"));
        assert_eq!(err.exit_code(), 69);
    }

    #[test]
    fn validation_and_auth_have_distinct_exit_codes() {
        let invalid = AppError::from(ModalError::from(DomainError::validation(
            PostField::Content,
            "content must not be empty",
        )));
        assert_eq!(invalid.exit_code(), 65);
        assert_eq!(AppError::from(ApiError::Unauthorized).exit_code(), 77);
    }

    #[test]
    fn unreadable_content_file_names_the_path() {
        let err = AppError::from(InfraError::content_file(
            "/tmp/missing-post.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        ));
        assert_eq!(err.exit_code(), 66);

        let report = err.report();
        assert!(report.messages[0].contains("/tmp/missing-post.txt"));
        assert_eq!(report.messages.last().map(String::as_str), Some("no such file"));
    }
}
