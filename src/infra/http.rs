//! `reqwest` adapter for the content and generation endpoints.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use postboard_api_types::{
    GenerateContentRequest, GeneratedContent, Post, PostId, PostWriteRequest,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url, header::AUTHORIZATION};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use crate::application::ports::{ApiError, ContentApi, GenerationApi};
use crate::config::ApiSettings;

use super::error::InfraError;
use super::session::Session;

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base: Url,
    session: Arc<Session>,
}

impl HttpApiClient {
    pub fn new(settings: &ApiSettings, session: Arc<Session>) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: with_trailing_slash(settings.base_url.clone()),
            session,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("postboard/", env!("CARGO_PKG_VERSION"))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(ApiError::network)
    }

    fn post_url(&self, id: &PostId) -> Result<Url, ApiError> {
        let mut url = self.url("content/")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::network("base URL cannot carry a path"))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match self.session.bearer() {
            Some(bearer) => request.header(AUTHORIZATION, bearer),
            None => request,
        }
    }

    async fn send<T, B>(
        &self,
        endpoint: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let result = request.send().await;
        metrics::histogram!("postboard_api_request_ms", "endpoint" => endpoint)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let response = result.map_err(|err| {
            warn!(endpoint, error = %err, "request failed before a response arrived");
            ApiError::network(err)
        })?;
        self.handle(endpoint, response).await
    }

    async fn handle<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(ApiError::Unauthorized);
        }

        let bytes = response.bytes().await.map_err(ApiError::network)?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(endpoint, status = status.as_u16(), "server rejected request");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(endpoint, status = status.as_u16(), bytes = bytes.len(), "response received");
        serde_json::from_slice(&bytes).map_err(ApiError::decode)
    }
}

/// Decode list entries one by one; a malformed post is logged and skipped.
fn decode_posts(entries: Vec<serde_json::Value>) -> Vec<Post> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry.get("id").map(ToString::to_string);
            match serde_json::from_value(entry) {
                Ok(post) => Some(post),
                Err(err) => {
                    warn!(id = ?id, error = %err, "skipping undecodable post");
                    None
                }
            }
        })
        .collect()
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl ContentApi for HttpApiClient {
    #[instrument(skip_all)]
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        let url = self.url("content/all")?;
        let entries: Vec<serde_json::Value> = self
            .send::<_, ()>("content.list", Method::GET, url, None)
            .await?;
        Ok(decode_posts(entries))
    }

    #[instrument(skip_all, fields(status = request.status.as_str()))]
    async fn create_post(&self, request: &PostWriteRequest) -> Result<Post, ApiError> {
        let url = self.url("content")?;
        self.send("content.create", Method::POST, url, Some(request))
            .await
    }

    #[instrument(skip_all, fields(post_id = %id, status = request.status.as_str()))]
    async fn update_post(
        &self,
        id: &PostId,
        request: &PostWriteRequest,
    ) -> Result<Post, ApiError> {
        let url = self.post_url(id)?;
        self.send("content.update", Method::PATCH, url, Some(request))
            .await
    }
}

#[async_trait]
impl GenerationApi for HttpApiClient {
    #[instrument(skip_all, fields(kind = request.kind.as_str()))]
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GeneratedContent, ApiError> {
        let url = self.url("ai/generate-content")?;
        self.send("ai.generate", Method::POST, url, Some(request))
            .await
    }
}
