//! visavis-client — Stateless REST client for the recognition service.
//!
//! The service owns face encoding, matching, and storage; this crate
//! only speaks its four endpoints and maps failures into the two
//! classes the orchestration loop cares about: transport failures
//! (retry naturally next tick) and service-reported errors (clear the
//! overlay, hide chat, no retry).

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use visavis_core::types::{Encoding, FaceRecord, FrameResult};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Request never produced a usable response: connection refused,
    /// timeout, malformed body.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-2xx status and (usually) an
    /// `error` body.
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },
}

impl ClientError {
    /// Transient failures are logged and retried naturally on the
    /// next tick; service errors additionally clear overlay and chat.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// The recognition service surface the orchestration layer consumes.
///
/// `RecognitionClient` is the production implementation; tests drive
/// the capture scheduler and enrollment flow against fakes.
pub trait RecognitionApi: Send + Sync {
    fn list_faces(&self) -> impl Future<Output = Result<Vec<FaceRecord>, ClientError>> + Send;
    fn recognize(&self, image: &str) -> impl Future<Output = Result<FrameResult, ClientError>> + Send;
    fn save_face(
        &self,
        name: &str,
        encoding: &Encoding,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;
    fn delete_face(&self, id: i64) -> impl Future<Output = Result<bool, ClientError>> + Send;
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
}

#[derive(Serialize)]
struct SaveFaceRequest<'a> {
    name: &'a str,
    encoding: &'a Encoding,
}

#[derive(Deserialize)]
struct FaceListResponse {
    faces: Vec<FaceRecord>,
}

#[derive(Deserialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the recognition service.
pub struct RecognitionClient {
    http: reqwest::Client,
    base_url: String,
}

impl RecognitionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-2xx response into `ClientError::Service`, pulling the
    /// `error` field out of the body when the service provided one.
    async fn service_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown service error")
                .to_string(),
        };
        ClientError::Service { status: status.as_u16(), message }
    }
}

impl RecognitionApi for RecognitionClient {
    async fn list_faces(&self) -> Result<Vec<FaceRecord>, ClientError> {
        let response = self.http.get(self.endpoint("/faces")).send().await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }
        let list: FaceListResponse = response.json().await?;
        tracing::debug!(count = list.faces.len(), "fetched face list");
        Ok(list.faces)
    }

    async fn recognize(&self, image: &str) -> Result<FrameResult, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/recognize"))
            .json(&RecognizeRequest { image })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }
        Ok(response.json::<FrameResult>().await?)
    }

    async fn save_face(&self, name: &str, encoding: &Encoding) -> Result<bool, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/save_face"))
            .json(&SaveFaceRequest { name, encoding })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }
        let body: SuccessResponse = response.json().await?;
        tracing::info!(name, success = body.success, "face saved");
        Ok(body.success)
    }

    async fn delete_face(&self, id: i64) -> Result<bool, ClientError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/faces/{id}")))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::service_error(response).await);
        }
        let body: SuccessResponse = response.json().await?;
        tracing::info!(id, success = body.success, "face deleted");
        Ok(body.success)
    }
}
