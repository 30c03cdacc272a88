use crate::context::{HttpContext, RequestClassification};
use crate::interceptor::{Interceptor, InterceptorResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request};

/// Marks every request passing through as API or view style
///
/// Stands in for the action-invocation layer when routes are grouped by style, e.g. one
/// instance per nested router. A classification recorded earlier is left alone.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInterceptor {
    classification: RequestClassification,
}

impl ClassificationInterceptor {
    pub fn new(classification: RequestClassification) -> Self {
        Self { classification }
    }

    /// Requests expecting `{"error": ...}` bodies.
    pub fn structured() -> Self {
        Self::new(RequestClassification::structured())
    }

    /// Requests expecting the host's error page.
    pub fn view() -> Self {
        Self::new(RequestClassification::view())
    }
}

#[async_trait]
impl Interceptor for ClassificationInterceptor {
    async fn intercept(&self, mut request: Request<Body>, next: Next) -> InterceptorResult {
        let ctx = HttpContext::get_or_insert(&mut request);
        let _ = ctx.classify(self.classification);
        next.run(request).await
    }
}
