use crate::exception::Exception;
use crate::interceptor::{Interceptor, Next};
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Tower Layer running a chain of interceptors around the inner service
///
/// The first interceptor is the outermost one. Errors of the inner service are turned
/// into [`Exception`]s before they reach the chain.
#[derive(Clone)]
pub struct InterceptorLayer {
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl InterceptorLayer {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: Arc::new(interceptors),
        }
    }

    pub fn single(interceptor: impl Interceptor) -> Self {
        Self::new(vec![Arc::new(interceptor)])
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorMiddleware {
            inner,
            interceptors: self.interceptors.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorMiddleware<S> {
    inner: S,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl<S> Service<Request<Body>> for InterceptorMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Exception> + Send,
{
    type Response = Response;
    type Error = Exception;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let interceptors = self.interceptors.clone();

        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut chain = Next::new(move |req| {
                Box::pin(async move { inner.oneshot(req).await.map_err(Into::into) })
            });

            // interceptors[0] wraps (interceptors[1] wraps ... (inner))
            for i in (0..interceptors.len()).rev() {
                let interceptors = interceptors.clone();
                let next = chain;
                chain = Next::new(move |req| {
                    Box::pin(async move { interceptors[i].intercept(req, next).await })
                });
            }

            chain.run(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorResult;
    use async_trait::async_trait;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use std::convert::Infallible;

    struct Tag(&'static str);

    #[async_trait]
    impl Interceptor for Tag {
        async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
            let mut response = next.run(request).await?;
            response
                .headers_mut()
                .append("x-trail", HeaderValue::from_static(self.0));
            Ok(response)
        }
    }

    #[tokio::test]
    async fn test_chain_order() {
        let layer = InterceptorLayer::new(vec![
            Arc::new(Tag("outer")) as Arc<dyn Interceptor>,
            Arc::new(Tag("inner")),
        ]);
        let service = layer.layer(tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));

        let response = service.oneshot(Request::new(Body::empty())).await.unwrap();

        let trail: Vec<_> = response.headers().get_all("x-trail").iter().collect();
        assert_eq!(trail, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn test_inner_error_reaches_caller_as_exception() {
        let layer = InterceptorLayer::single(Tag("outer"));
        let service = layer.layer(tower::service_fn(|_req: Request<Body>| async {
            Err::<Response, _>(Box::new(std::io::Error::other("socket closed"))
                as Box<dyn std::error::Error + Send + Sync>)
        }));

        let err = service.oneshot(Request::new(Body::empty())).await.unwrap_err();

        assert_eq!(err.message(), "socket closed");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
