//! The HTTP seam between the bot and the outside world.

use async_trait::async_trait;

use crate::error::ApiError;

/// The body of an outgoing API request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// An encoded body with its content type, produced by the codec.
    Encoded { content_type: &'static str, bytes: Vec<u8> },
    /// Multipart form data: text fields plus named file parts.
    Multipart { fields: Vec<(String, String)>, files: Vec<FilePart> },
}

/// One file in a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// The form field name, e.g. `photo`.
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// An outgoing API request, already addressed and encoded.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub body: RequestBody,
}

/// The raw result of an API request.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Carries requests to the platform. Implementations own retries at the
/// connection level; rate-limit handling stays with the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// A transport that refuses every request. Used by offline bots so that a
/// stray API call fails loudly instead of hitting the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        // The URL embeds the token, so only the method name is echoed back.
        let method = request.url.rsplit('/').next().unwrap_or_default();
        Err(ApiError::Other(format!("offline transport: refusing {method}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_transport_refuses() {
        let req = ApiRequest {
            url: "https://api.example.org/botTOKEN/getMe".into(),
            body: RequestBody::Encoded { content_type: "application/json", bytes: b"{}".to_vec() },
        };
        assert!(NullTransport.execute(req).await.is_err());
    }
}
