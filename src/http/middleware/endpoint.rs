//! Endpoint identity.
//!
//! Wraps a single handler and stamps its [`EndpointKey`] into the request
//! and response extensions. The logging layer reads the key from the
//! response to find the endpoint's transformer.

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::transform::EndpointKey;

/// Layer attaching an endpoint identity to every request it sees.
///
/// ```ignore
/// .route("/orders", post(create).layer(EndpointLayer::new("OrdersController", "create")))
/// ```
#[derive(Debug, Clone)]
pub struct EndpointLayer {
    key: EndpointKey,
}

impl EndpointLayer {
    pub fn new(owner: &str, method: &str) -> Self {
        Self {
            key: EndpointKey::new(owner, method),
        }
    }
}

impl<S> Layer<S> for EndpointLayer {
    type Service = EndpointService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EndpointService {
            inner,
            key: self.key.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EndpointService<S> {
    inner: S,
    key: EndpointKey,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for EndpointService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        req.extensions_mut().insert(self.key.clone());
        let key = self.key.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            response.extensions_mut().insert(key);
            Ok(response)
        })
    }
}
