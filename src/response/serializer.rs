use crate::common::ErrorEnvelope;
use crate::error::SerializeError;
use axum::{body::Bytes, http::HeaderValue};

/// Renders the error envelope into the wire format
pub trait PayloadSerializer: Send + Sync + 'static {
    fn content_type(&self) -> HeaderValue;

    fn serialize(&self, envelope: &ErrorEnvelope) -> Result<Bytes, SerializeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl PayloadSerializer for JsonSerializer {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("application/json; charset=utf-8")
    }

    fn serialize(&self, envelope: &ErrorEnvelope) -> Result<Bytes, SerializeError> {
        Ok(Bytes::from(serde_json::to_vec(envelope)?))
    }
}
