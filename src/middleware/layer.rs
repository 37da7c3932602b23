use crate::middleware::{BoxFuture, MiddlewareHandler, MiddlewareResult, Next, PathMiddleware};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{body::Body, http::Request, response::Response};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer that runs a compiled middleware chain in front of a service.
///
/// For each request, every group whose path prefix matches the request path
/// contributes its handlers, in chain order. A middleware error becomes a
/// `500 Internal Server Error` response.
#[derive(Clone)]
pub struct MiddlewareLayer {
    chain: Arc<Vec<PathMiddleware>>,
}

impl MiddlewareLayer {
    pub fn new(chain: Vec<PathMiddleware>) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            inner,
            chain: Arc::clone(&self.chain),
        }
    }
}

#[derive(Clone)]
pub struct MiddlewareService<S> {
    inner: S,
    chain: Arc<Vec<PathMiddleware>>,
}

impl<S> Service<Request<Body>> for MiddlewareService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let path = request.uri().path().to_string();
        let handlers: Vec<MiddlewareHandler> = self
            .chain
            .iter()
            .filter(|group| group.matches(&path))
            .flat_map(|group| group.handlers().iter().cloned())
            .collect();
        tracing::trace!(%path, middleware = handlers.len(), "Running middleware chain");

        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let mut chain = Next::new(move |req| -> BoxFuture<'static, MiddlewareResult> {
            Box::pin(async move {
                match inner.call(req).await {
                    Ok(response) => Ok(response),
                    Err(never) => match never {},
                }
            })
        });

        for handler in handlers.into_iter().rev() {
            let next = chain;
            chain = Next::new(move |req| -> BoxFuture<'static, MiddlewareResult> {
                Box::pin(async move { handler.handle(req, next).await })
            });
        }

        Box::pin(async move {
            match chain.run(request).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    tracing::error!(%path, "Middleware failed: {}", e);
                    Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
                }
            }
        })
    }
}
