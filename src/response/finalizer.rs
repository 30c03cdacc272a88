use crate::common::{ErrorEnvelope, ErrorRecord};
use crate::error::{ResponseError, SerializeError};
use crate::response::{JsonSerializer, PayloadSerializer, ResponseChannel};
use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
};
use std::sync::Arc;

/// Default marker header flagging a wrapped error body
pub const ERROR_FORMAT_HEADER: &str = "x-meshestra-error-format";

/// Written when the configured serializer cannot render the envelope.
const FALLBACK_BODY: &[u8] = concat!(
    r#"{"error":{"code":null,"message":"An internal error occurred.","#,
    r#""details":null,"data":{},"validationErrors":[]}}"#,
)
.as_bytes();

/// Force the response out of every cache.
///
/// Registered as an `on_starting` callback so headers added later in the pipeline are
/// overwritten. Running it twice leaves the same headers as running it once.
pub fn clear_cache_headers(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("-1"));
    headers.remove(header::ETAG);
}

/// Writes a wrapped error into a response channel
#[derive(Clone)]
pub struct ResponseFinalizer {
    error_header: HeaderName,
    serializer: Arc<dyn PayloadSerializer>,
}

impl Default for ResponseFinalizer {
    fn default() -> Self {
        Self {
            error_header: HeaderName::from_static(ERROR_FORMAT_HEADER),
            serializer: Arc::new(JsonSerializer),
        }
    }
}

impl ResponseFinalizer {
    pub fn new(error_header: HeaderName, serializer: Arc<dyn PayloadSerializer>) -> Self {
        Self {
            error_header,
            serializer,
        }
    }

    pub fn error_header(&self) -> &HeaderName {
        &self.error_header
    }

    /// Replace whatever was staged with `{"error": record}` under `status`.
    ///
    /// Fails only when the channel left the staging state, in which case nothing
    /// meaningful can be written anymore. If the serializer failed, the generic body was
    /// written instead and the serializer's error is returned for the caller to report.
    pub fn finalize(
        &self,
        response: &ResponseChannel,
        status: StatusCode,
        record: &ErrorRecord,
    ) -> Result<Option<SerializeError>, ResponseError> {
        let (content_type, body, serialize_error) = match self.render(record) {
            Ok(body) => (self.serializer.content_type(), body, None),
            Err(err) => (
                HeaderValue::from_static("application/json; charset=utf-8"),
                Bytes::from_static(FALLBACK_BODY),
                Some(err),
            ),
        };

        response.clear()?;
        response.set_status(status)?;
        response.on_starting(clear_cache_headers)?;
        response.insert_header(self.error_header.clone(), HeaderValue::from_static("true"))?;
        response.insert_header(header::CONTENT_TYPE, content_type)?;
        response.write(body)?;
        Ok(serialize_error)
    }

    fn render(&self, record: &ErrorRecord) -> Result<Bytes, SerializeError> {
        self.serializer.serialize(&ErrorEnvelope::new(record.clone()))
    }
}

impl std::fmt::Debug for ResponseFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFinalizer")
            .field("error_header", &self.error_header)
            .finish_non_exhaustive()
    }
}
