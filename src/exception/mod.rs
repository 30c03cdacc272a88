//! Exception values flowing out of downstream handlers
//!
//! An [`Exception`] carries its classification as data, decided where the error is
//! built, instead of being inferred later from its concrete type. The status code
//! resolver and the error info converter only ever read these tags.

use crate::common::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::Level;

pub mod convert;
pub mod status;

pub use convert::{DefaultErrorInfoConverter, ErrorInfoConverter};
pub use status::{DefaultStatusCodeResolver, StatusCodeResolver};

/// A type-erased error as produced by arbitrary downstream code
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Classification tag of an exception
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[default]
    Unknown,
    NotFound,
    Validation,
    Business,
    Conflict,
    Unauthenticated,
    Forbidden,
    NotImplemented,
}

/// An unhandled failure raised by application code
///
/// # Example
/// ```
/// use meshestra_exception_handling::exception::{ErrorKind, Exception};
///
/// let ex = Exception::business("Blog:00001", "Blog not found")
///     .with_kind(ErrorKind::NotFound)
///     .with_data("blogId", 42);
///
/// assert!(ex.is_public());
/// assert_eq!(ex.code(), Some("Blog:00001"));
/// ```
#[derive(Debug)]
pub struct Exception {
    kind: ErrorKind,
    message: String,
    public: bool,
    code: Option<String>,
    details: Option<String>,
    status: Option<StatusCode>,
    data: Map<String, Value>,
    violations: Vec<ValidationError>,
    log_level: Option<Level>,
    source: Option<BoxError>,
    backtrace: Backtrace,
}

impl Exception {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            public: false,
            code: None,
            details: None,
            status: None,
            data: Map::new(),
            violations: Vec::new(),
            log_level: None,
            source: None,
            backtrace: Backtrace::capture(),
        }
    }

    /// An incidental failure with no public meaning.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// A business rule violation whose code and message are meant for the client.
    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut ex = Self::new(ErrorKind::Business, message);
        ex.public = true;
        ex.code = Some(code.into());
        ex
    }

    /// A business exception without an error code.
    pub fn user_friendly(message: impl Into<String>) -> Self {
        let mut ex = Self::new(ErrorKind::Business, message);
        ex.public = true;
        ex
    }

    pub fn validation<I>(violations: I) -> Self
    where
        I: IntoIterator<Item = ValidationError>,
    {
        let violations: Vec<_> = violations.into_iter().collect();
        let mut ex = Self::new(
            ErrorKind::Validation,
            format!("Validation failed with {} error(s)", violations.len()),
        );
        ex.violations = violations;
        ex
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    /// Reclassify, keeping every other attribute.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach an explicit HTTP status; it wins over every classification rule.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether code, message, details and data were authored for the client.
    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn violations(&self) -> &[ValidationError] {
        &self.violations
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Level the exception is logged at when it is caught.
    pub fn log_level(&self) -> Level {
        if let Some(level) = self.log_level {
            return level;
        }
        match self.kind {
            ErrorKind::Unknown | ErrorKind::NotImplemented => Level::ERROR,
            _ => Level::WARN,
        }
    }

    /// Causes of this exception, innermost last. The exception itself is not included.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(self.source(), |&err| err.source())
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for Exception {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

impl From<BoxError> for Exception {
    fn from(err: BoxError) -> Self {
        match err.downcast::<Exception>() {
            Ok(ex) => *ex,
            Err(err) => Exception::internal(err.to_string()).with_source(err),
        }
    }
}

impl From<anyhow::Error> for Exception {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Exception>() {
            Ok(ex) => ex,
            Err(err) => Exception::internal(err.to_string()).with_source(err),
        }
    }
}

impl From<std::convert::Infallible> for Exception {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

/// Host-level fallback for exceptions that were not wrapped
///
/// Renders a bare status page with the canonical reason phrase, nothing from the exception
/// itself. The status follows the same rules as a wrapped response. The exception rides
/// along in the response extensions as a [`RaisedException`], so an interceptor around a
/// `Router` can still wrap errors returned by its handlers.
impl IntoResponse for Exception {
    fn into_response(self) -> Response {
        let status = DefaultStatusCodeResolver::new().resolve(&self);
        let reason = status.canonical_reason().unwrap_or("Error");
        let mut response = (status, reason).into_response();
        RaisedException::attach(&mut response, self);
        response
    }
}

/// An exception that was already rendered as a fallback page
///
/// Can be taken out once; clones share the same slot.
#[derive(Clone)]
pub struct RaisedException(Arc<Mutex<Option<Exception>>>);

impl RaisedException {
    pub fn attach(response: &mut Response, exception: Exception) {
        response
            .extensions_mut()
            .insert(Self(Arc::new(Mutex::new(Some(exception)))));
    }

    /// Remove the exception carried by `response`, if any.
    pub fn take_from(response: &mut Response) -> Option<Exception> {
        response
            .extensions_mut()
            .remove::<Self>()
            .and_then(|raised| raised.0.lock().take())
    }
}

impl fmt::Debug for RaisedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RaisedException")
            .field(&self.0.lock().is_some())
            .finish()
    }
}
