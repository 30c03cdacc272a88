use crate::exception::Exception;
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

pub mod classification;
pub mod exception;
pub mod layer;
pub(crate) mod logging;

pub use classification::ClassificationInterceptor;
pub use exception::{ExceptionHandlingInterceptor, ExceptionHandlingInterceptorBuilder};
pub use layer::{InterceptorLayer, InterceptorMiddleware};

/// standard return type for Interceptors
pub type InterceptorResult = Result<Response, Exception>;

/// Boxed future returned by the rest of the chain
pub type BoxFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;

/// Represents the next handler in the chain
pub struct Next {
    pub(crate) run: Box<dyn FnOnce(Request<Body>) -> BoxFuture + Send>,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// The Interceptor trait
///
/// Interceptors wrap the downstream handler: they may inspect the request before it is
/// passed on and decide what happens to the response or the exception coming back.
/// Returning `Err` re-raises to the next outer interceptor.
///
/// # Example
/// ```
/// use meshestra_exception_handling::interceptor::{Interceptor, InterceptorResult, Next};
/// use meshestra_exception_handling::async_trait;
/// use axum::{body::Body, http::Request};
///
/// struct Passthrough;
///
/// #[async_trait]
/// impl Interceptor for Passthrough {
///     async fn intercept(&self, req: Request<Body>, next: Next) -> InterceptorResult {
///         next.run(req).await
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
