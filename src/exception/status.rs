use crate::exception::{ErrorKind, Exception};
use axum::http::StatusCode;
use std::collections::HashMap;

/// Maps an exception to the HTTP status code of its wrapped response
///
/// Implementations must be pure: the same exception always yields the same status, and
/// a single instance is shared across all in-flight requests.
pub trait StatusCodeResolver: Send + Sync + 'static {
    fn resolve(&self, exception: &Exception) -> StatusCode;
}

/// Default resolution policy
///
/// First match wins:
/// 1. the status carried by the exception itself
/// 2. a status mapped to the exception's error code
/// 3. the status of its classification (401/403, 404, 400, 409, 501)
/// 4. 500
#[derive(Debug, Clone, Default)]
pub struct DefaultStatusCodeResolver {
    code_map: HashMap<String, StatusCode>,
}

impl DefaultStatusCodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_map(code_map: HashMap<String, StatusCode>) -> Self {
        Self { code_map }
    }

    /// Map a business error code to a fixed status.
    pub fn map(mut self, code: impl Into<String>, status: StatusCode) -> Self {
        self.code_map.insert(code.into(), status);
        self
    }
}

impl StatusCodeResolver for DefaultStatusCodeResolver {
    fn resolve(&self, exception: &Exception) -> StatusCode {
        if let Some(status) = exception.status() {
            return status;
        }

        if let Some(status) = exception.code().and_then(|code| self.code_map.get(code)) {
            return *status;
        }

        match exception.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation | ErrorKind::Business => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
