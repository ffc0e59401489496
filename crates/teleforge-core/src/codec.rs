//! Pluggable body encoding for API calls.

use serde_json::Value;

use crate::error::ApiError;

/// Encodes request parameters and decodes response bodies.
///
/// The bot talks to the codec at the [`Value`] level so a replacement codec
/// never has to know about concrete API types.
pub trait Codec: Send + Sync {
    /// Serializes parameters into a request body.
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, ApiError>;

    /// Deserializes a response body.
    fn unmarshal(&self, bytes: &[u8]) -> Result<Value, ApiError>;

    /// The `Content-Type` to send alongside marshalled bodies.
    fn content_type(&self) -> &'static str;
}

/// The default codec: plain JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, ApiError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<Value, ApiError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip() {
        let codec = JsonCodec;
        let value = json!({"chat_id": "42", "text": "hi"});
        let bytes = codec.marshal(&value).unwrap();
        assert_eq!(codec.unmarshal(&bytes).unwrap(), value);
    }

    #[test]
    fn unmarshal_rejects_garbage() {
        assert!(JsonCodec.unmarshal(b"not json").is_err());
    }
}
