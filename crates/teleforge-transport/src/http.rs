//! The reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::ClientBuilder;
use reqwest::header::CONTENT_TYPE;

use teleforge_core::error::ApiError;
use teleforge_core::transport::{ApiRequest, ApiResponse, RequestBody, Transport};

/// Long polls hold the connection open for up to the poll timeout; the
/// client-side timeout must sit comfortably above it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Carries API requests over HTTPS using a shared connection pool.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Overrides the per-request timeout. Keep it above the long-poll
    /// timeout when this transport also serves a [`crate::LongPoller`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(ApiError::transport)?;
        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let builder = match request.body {
            RequestBody::Encoded { content_type, bytes } => self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, content_type)
                .body(bytes),
            RequestBody::Multipart { fields, files } => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                for file in files {
                    let part =
                        reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
                    form = form.part(file.field, part);
                }
                self.client.post(&request.url).multipart(form)
            }
        };
        let response = builder.send().await.map_err(ApiError::transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ApiError::transport)?.to_vec();
        Ok(ApiResponse { status, body })
    }
}
