//! Collaborator traits for the remote content and generation API.

use async_trait::async_trait;
use postboard_api_types::{
    GenerateContentRequest, GeneratedContent, Post, PostId, PostWriteRequest,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response body: {0}")]
    Decode(String),
    #[error("credential rejected by the server")]
    Unauthorized,
}

impl ApiError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            ApiError::Decode(_) | ApiError::Unauthorized => false,
        }
    }
}

#[async_trait]
pub trait ContentApi: Send + Sync {
    /// `GET /content/all`, in backend order.
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError>;

    /// `POST /content`.
    async fn create_post(&self, request: &PostWriteRequest) -> Result<Post, ApiError>;

    /// `PATCH /content/{id}`.
    async fn update_post(&self, id: &PostId, request: &PostWriteRequest)
    -> Result<Post, ApiError>;
}

#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// `POST /ai/generate-content`.
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GeneratedContent, ApiError>;
}
