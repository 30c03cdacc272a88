//! Wraps unhandled exceptions into structured error responses

use crate::common::ErrorRecord;
use crate::config::{ConfigService, ExceptionHandlingOptions};
use crate::context::HttpContext;
use crate::error::{ConfigError, ConversionError, Error};
use crate::exception::{
    DefaultErrorInfoConverter, DefaultStatusCodeResolver, ErrorInfoConverter, Exception,
    RaisedException, StatusCodeResolver, convert::INTERNAL_ERROR_MESSAGE,
};
use crate::interceptor::logging::{Outcome, RequestLine, log_exception};
use crate::interceptor::{Interceptor, InterceptorLayer, InterceptorResult, Next};
use crate::response::{JsonSerializer, PayloadSerializer, ResponseFinalizer};
use async_trait::async_trait;
use axum::http::{HeaderName, StatusCode};
use axum::{body::Body, http::Request};
use std::sync::Arc;
use std::time::Instant;

/// Turns a failed downstream invocation into a wrapped error response
///
/// On failure:
/// - if the response already started, the exception is re-raised untouched;
/// - if the request was not classified as expecting a structured error, it is re-raised
///   for the host's error page;
/// - otherwise status and error record are written through the [`ResponseFinalizer`] and
///   the request completes with that response.
///
/// Each caught exception is logged exactly once, after the outcome is known. A failure
/// may arrive as `Err` or as a response rendered by a `Router` that carries a
/// [`RaisedException`]. Other successful responses pass through unchanged.
#[derive(Clone)]
pub struct ExceptionHandlingInterceptor {
    status_codes: Arc<dyn StatusCodeResolver>,
    converter: Arc<dyn ErrorInfoConverter>,
    finalizer: ResponseFinalizer,
}

impl Default for ExceptionHandlingInterceptor {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExceptionHandlingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ExceptionHandlingInterceptorBuilder {
        ExceptionHandlingInterceptorBuilder::default()
    }

    /// Default collaborators configured from `options`.
    pub fn from_options(options: &ExceptionHandlingOptions) -> Result<Self, ConfigError> {
        let resolver = DefaultStatusCodeResolver::with_code_map(options.status_codes()?);
        let header = options.error_header()?;

        Ok(Self::builder()
            .status_code_resolver(resolver)
            .error_info_converter(DefaultErrorInfoConverter::new(
                options.send_exception_details,
            ))
            .error_header(header)
            .build())
    }

    /// Options read from a [`ConfigService`].
    pub fn from_config(config: &ConfigService) -> crate::Result<Self> {
        let options = ExceptionHandlingOptions::from_config(config)?;
        Ok(Self::from_options(&options)?)
    }

    /// A layer running only this interceptor.
    pub fn into_layer(self) -> InterceptorLayer {
        InterceptorLayer::single(self)
    }

    fn handle(
        &self,
        ctx: &HttpContext,
        exception: Exception,
        request: RequestLine,
    ) -> InterceptorResult {
        let response = ctx.response();

        if response.has_started() {
            log_exception(&exception, Outcome::ResponseStarted, &request, &[]);
            return Err(exception);
        }

        let expects_structured = ctx
            .classification()
            .is_some_and(|c| c.expects_structured_error);
        if !expects_structured {
            log_exception(&exception, Outcome::Unclassified, &request, &[]);
            return Err(exception);
        }

        let (status, record, conversion_error) = self.translate(&exception);
        let mut failures: Vec<Error> = conversion_error.into_iter().map(Error::from).collect();

        let written = match self.finalizer.finalize(response, status, &record) {
            Ok(serialize_error) => {
                failures.extend(serialize_error.map(Error::from));
                response.commit()
            }
            Err(err) => Err(err),
        };

        match written {
            Ok(wrapped) => {
                log_exception(&exception, Outcome::Wrapped(status), &request, &failures);
                Ok(wrapped)
            }
            // Started or aborted under our feet: same as finding it started.
            Err(err) => {
                failures.push(err.into());
                log_exception(&exception, Outcome::WriteFailed, &request, &failures);
                Err(exception)
            }
        }
    }

    fn translate(
        &self,
        exception: &Exception,
    ) -> (StatusCode, ErrorRecord, Option<ConversionError>) {
        match self.converter.try_convert(exception) {
            Ok(record) => (self.status_codes.resolve(exception), record, None),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorRecord::new(INTERNAL_ERROR_MESSAGE),
                Some(err),
            ),
        }
    }
}

#[async_trait]
impl Interceptor for ExceptionHandlingInterceptor {
    async fn intercept(&self, mut request: Request<Body>, next: Next) -> InterceptorResult {
        let ctx = HttpContext::get_or_insert(&mut request);
        let method = request.method().clone();
        let uri = request.uri().clone();
        let start = Instant::now();

        // A `Router` renders handler errors itself; the exception travels on the response.
        let (exception, rendered) = match next.run(request).await {
            Ok(mut response) => match RaisedException::take_from(&mut response) {
                Some(exception) => (exception, Some(response)),
                None => return Ok(response),
            },
            Err(exception) => (exception, None),
        };

        let request = RequestLine {
            method,
            uri,
            elapsed: start.elapsed(),
        };
        match (self.handle(&ctx, exception, request), rendered) {
            // Re-raised in the form it arrived: the host's page, still carrying the exception.
            (Err(exception), Some(mut response)) => {
                RaisedException::attach(&mut response, exception);
                Ok(response)
            }
            (result, _) => result,
        }
    }
}

impl std::fmt::Debug for ExceptionHandlingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionHandlingInterceptor")
            .field("finalizer", &self.finalizer)
            .finish_non_exhaustive()
    }
}

/// Builder supplying the interceptor's collaborators
pub struct ExceptionHandlingInterceptorBuilder {
    status_codes: Arc<dyn StatusCodeResolver>,
    converter: Arc<dyn ErrorInfoConverter>,
    serializer: Arc<dyn PayloadSerializer>,
    error_header: Option<HeaderName>,
}

impl Default for ExceptionHandlingInterceptorBuilder {
    fn default() -> Self {
        Self {
            status_codes: Arc::new(DefaultStatusCodeResolver::new()),
            converter: Arc::new(DefaultErrorInfoConverter::default()),
            serializer: Arc::new(JsonSerializer),
            error_header: None,
        }
    }
}

impl ExceptionHandlingInterceptorBuilder {
    pub fn status_code_resolver(mut self, resolver: impl StatusCodeResolver) -> Self {
        self.status_codes = Arc::new(resolver);
        self
    }

    pub fn error_info_converter(mut self, converter: impl ErrorInfoConverter) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    pub fn serializer(mut self, serializer: impl PayloadSerializer) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    pub fn error_header(mut self, name: HeaderName) -> Self {
        self.error_header = Some(name);
        self
    }

    pub fn build(self) -> ExceptionHandlingInterceptor {
        let finalizer = match self.error_header {
            Some(header) => ResponseFinalizer::new(header, self.serializer),
            None => ResponseFinalizer::new(
                HeaderName::from_static(crate::response::finalizer::ERROR_FORMAT_HEADER),
                self.serializer,
            ),
        };

        ExceptionHandlingInterceptor {
            status_codes: self.status_codes,
            converter: self.converter,
            finalizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestClassification;
    use crate::response::ResponseChannel;
    use axum::http::{Method, Uri};
    use std::time::Duration;

    fn request_line() -> RequestLine {
        RequestLine {
            method: Method::GET,
            uri: Uri::from_static("/api/blogs/1"),
            elapsed: Duration::from_millis(3),
        }
    }

    struct FailingConverter;

    impl ErrorInfoConverter for FailingConverter {
        fn try_convert(&self, _exception: &Exception) -> Result<ErrorRecord, ConversionError> {
            Err(ConversionError::Other("template missing".to_string()))
        }
    }

    #[test]
    fn test_conversion_failure_falls_back_to_generic_500() {
        let interceptor = ExceptionHandlingInterceptor::builder()
            .error_info_converter(FailingConverter)
            .build();
        let ctx = HttpContext::default();
        ctx.classify(RequestClassification::structured()).unwrap();

        let response = interceptor
            .handle(&ctx, Exception::business("Blog:00001", "Blog not found"), request_line())
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&ctx.response().body()).unwrap();
        assert_eq!(body["error"]["message"], INTERNAL_ERROR_MESSAGE);
        assert!(body["error"]["code"].is_null());
    }

    #[test]
    fn test_aborted_response_rethrows() {
        let interceptor = ExceptionHandlingInterceptor::new();
        let channel = ResponseChannel::new();
        let ctx = HttpContext::new(channel.clone());
        ctx.classify(RequestClassification::structured()).unwrap();
        channel.abort("client went away");

        let err = interceptor
            .handle(&ctx, Exception::internal("boom"), request_line())
            .unwrap_err();

        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_from_config_rejects_bad_header() {
        let config = ConfigService::default();
        config.set(crate::config::ERROR_HEADER_KEY, "bad header");

        assert!(matches!(
            ExceptionHandlingInterceptor::from_config(&config),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_from_options_uses_header_and_code_map() {
        let mut options = ExceptionHandlingOptions::default();
        options.error_header = "x-wrapped".to_string();
        options
            .status_code_map
            .insert("Blog:00001".to_string(), 410);
        let interceptor = ExceptionHandlingInterceptor::from_options(&options).unwrap();
        let ctx = HttpContext::default();
        ctx.classify(RequestClassification::structured()).unwrap();

        let response = interceptor
            .handle(&ctx, Exception::business("Blog:00001", "Blog not found"), request_line())
            .unwrap();

        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(response.headers()["x-wrapped"], "true");
    }
}
