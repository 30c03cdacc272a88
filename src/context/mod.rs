//! Request-scoped context threaded through request extensions

use crate::response::ResponseChannel;
use axum::{body::Body, http::Request};
use std::sync::{Arc, OnceLock};

pub mod extractor;

/// Whether the request expects a structured error body
///
/// Produced by the action-invocation layer once the target action is known: API actions
/// returning data expect `{"error": ...}`, view actions expect the host's error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestClassification {
    pub expects_structured_error: bool,
}

impl RequestClassification {
    pub fn structured() -> Self {
        Self {
            expects_structured_error: true,
        }
    }

    pub fn view() -> Self {
        Self {
            expects_structured_error: false,
        }
    }
}

struct ContextInner {
    classification: OnceLock<RequestClassification>,
    response: ResponseChannel,
}

/// Per-request state shared between the pipeline and the handler
///
/// Cheap to clone; all clones observe the same classification and response.
#[derive(Clone)]
pub struct HttpContext {
    inner: Arc<ContextInner>,
}

impl Default for HttpContext {
    fn default() -> Self {
        Self::new(ResponseChannel::new())
    }
}

impl HttpContext {
    pub fn new(response: ResponseChannel) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                classification: OnceLock::new(),
                response,
            }),
        }
    }

    /// Record the classification. Only the first call takes effect; a later one gets its
    /// value back as the error.
    pub fn classify(
        &self,
        classification: RequestClassification,
    ) -> Result<(), RequestClassification> {
        self.inner.classification.set(classification)
    }

    pub fn classification(&self) -> Option<RequestClassification> {
        self.inner.classification.get().copied()
    }

    pub fn response(&self) -> &ResponseChannel {
        &self.inner.response
    }

    pub fn from_request(request: &Request<Body>) -> Option<Self> {
        request.extensions().get::<Self>().cloned()
    }

    /// Context already attached to the request, or a fresh one attached now.
    pub fn get_or_insert(request: &mut Request<Body>) -> Self {
        if let Some(ctx) = Self::from_request(request) {
            return ctx;
        }
        let ctx = Self::default();
        request.extensions_mut().insert(ctx.clone());
        ctx
    }
}

impl std::fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContext")
            .field("classification", &self.classification())
            .field("response", &self.inner.response)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_write_once() {
        let ctx = HttpContext::default();
        assert_eq!(ctx.classification(), None);

        ctx.classify(RequestClassification::structured()).unwrap();
        let rejected = ctx.classify(RequestClassification::view());

        assert_eq!(rejected, Err(RequestClassification::view()));
        assert_eq!(ctx.classification(), Some(RequestClassification::structured()));
    }

    #[test]
    fn test_get_or_insert_reuses_existing() {
        let mut request = Request::new(Body::empty());
        let first = HttpContext::get_or_insert(&mut request);
        first.classify(RequestClassification::structured()).unwrap();

        let second = HttpContext::get_or_insert(&mut request);
        assert_eq!(second.classification(), Some(RequestClassification::structured()));

        let looked_up = HttpContext::from_request(&request).unwrap();
        assert!(!looked_up.response().has_started());
    }
}
