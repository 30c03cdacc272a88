use crate::context::HttpContext;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode as HttpStatusCode, request::Parts},
};

/// Axum extractor for the request context
///
/// Available to any handler running behind the exception handling interceptor, which
/// attaches the context before calling downstream.
///
/// # Example
/// ```
/// use meshestra_exception_handling::context::{HttpContext, RequestClassification};
///
/// async fn list_blogs(ctx: HttpContext) -> &'static str {
///     let _ = ctx.classify(RequestClassification::structured());
///     "[]"
/// }
/// ```
impl<S> FromRequestParts<S> for HttpContext
where
    S: Send + Sync,
{
    type Rejection = (HttpStatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<HttpContext>().cloned().ok_or((
            HttpStatusCode::INTERNAL_SERVER_ERROR,
            "Request context missing: is the exception handling interceptor installed?",
        ))
    }
}
