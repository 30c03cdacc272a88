//! # Meshestra exception handling
//!
//! Translates exceptions that escaped the request pipeline into structured error
//! responses, without corrupting responses that already started.
//!
//! ## Features
//!
//! - **Tagged exceptions**: [`Exception`] carries its classification (not found, validation,
//!   business, ...) instead of relying on its concrete type
//! - **Stable public contract**: `{"error": {"code", "message", "details", "data",
//!   "validationErrors"}}`, with internal details hidden unless explicitly enabled
//! - **Safe writes**: responses that already sent their head are never touched; the
//!   exception is re-raised instead
//! - **No-cache errors**: cache headers are forced right before the head is transmitted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshestra_exception_handling::prelude::*;
//! use axum::body::Body;
//! use axum::http::Request;
//! use tower::{Layer, ServiceExt};
//!
//! # async fn run() {
//! let layer = InterceptorLayer::new(vec![
//!     Arc::new(ExceptionHandlingInterceptor::new()) as Arc<dyn Interceptor>,
//!     Arc::new(ClassificationInterceptor::structured()),
//! ]);
//!
//! let service = layer.layer(tower::service_fn(|_req: Request<Body>| async {
//!     let ex = Exception::business("Blog:00001", "Blog not found").with_kind(ErrorKind::NotFound);
//!     Err::<Response, _>(ex)
//! }));
//!
//! let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! # }
//! ```

pub mod common;
pub mod config;
pub mod context;
pub mod error;
pub mod exception;
pub mod interceptor;
pub mod response;

// Re-export core types
pub use common::{ErrorEnvelope, ErrorRecord, ValidationError};
pub use context::{HttpContext, RequestClassification};
pub use error::{Error, Result};
pub use exception::{ErrorKind, Exception, RaisedException};
pub use interceptor::ExceptionHandlingInterceptor;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_exception_handling::prelude::*;
/// ```
pub mod prelude {
    pub use crate::common::{ErrorEnvelope, ErrorRecord, ValidationError};
    pub use crate::config::{ConfigService, ExceptionHandlingOptions};
    pub use crate::context::{HttpContext, RequestClassification};
    pub use crate::error::{Error, Result};
    pub use crate::exception::{
        DefaultErrorInfoConverter, DefaultStatusCodeResolver, ErrorInfoConverter, ErrorKind,
        Exception, RaisedException, StatusCodeResolver,
    };
    pub use crate::interceptor::{
        ClassificationInterceptor, ExceptionHandlingInterceptor, Interceptor, InterceptorLayer,
        InterceptorResult, Next,
    };
    pub use crate::response::{
        JsonSerializer, PayloadSerializer, ResponseChannel, ResponseFinalizer,
    };
    pub use async_trait::async_trait;
    pub use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
