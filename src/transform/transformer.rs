//! Per-endpoint body transformers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure raised by a transformer hook.
///
/// Never propagated past the log builder; its message ends up in the record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Controls whether and how a route's request/response bodies are logged.
///
/// All hooks default to pass-through.
pub trait BodyLogTransformer: Send + Sync + 'static {
    /// Value logged in place of the request body.
    fn transform_request(&self, request: &Value) -> Result<Value, TransformError> {
        Ok(request.clone())
    }

    /// Value logged in place of the response body.
    fn transform_response(&self, response: &Value) -> Result<Value, TransformError> {
        Ok(response.clone())
    }

    /// Return true to drop the record for this request entirely.
    fn skip(&self, _request: &Value, _response: &Value) -> Result<bool, TransformError> {
        Ok(false)
    }
}

/// Transformer working on typed bodies.
///
/// Wrap in [`Typed`] to register it. A body that does not deserialize into
/// the declared type is reported as a transform failure.
pub trait TypedTransformer: Send + Sync + 'static {
    type Request: DeserializeOwned + Serialize;
    type Response: DeserializeOwned + Serialize;

    fn transform_request(&self, request: Self::Request) -> Result<Value, TransformError> {
        Ok(serde_json::to_value(request)?)
    }

    fn transform_response(&self, response: Self::Response) -> Result<Value, TransformError> {
        Ok(serde_json::to_value(response)?)
    }

    fn skip(
        &self,
        _request: &Self::Request,
        _response: &Self::Response,
    ) -> Result<bool, TransformError> {
        Ok(false)
    }
}

/// Adapter exposing a [`TypedTransformer`] as a [`BodyLogTransformer`].
#[derive(Debug, Clone, Default)]
pub struct Typed<T>(pub T);

impl<T: TypedTransformer> BodyLogTransformer for Typed<T> {
    fn transform_request(&self, request: &Value) -> Result<Value, TransformError> {
        let typed = T::Request::deserialize(request)?;
        self.0.transform_request(typed)
    }

    fn transform_response(&self, response: &Value) -> Result<Value, TransformError> {
        let typed = T::Response::deserialize(response)?;
        self.0.transform_response(typed)
    }

    fn skip(&self, request: &Value, response: &Value) -> Result<bool, TransformError> {
        let req = T::Request::deserialize(request)?;
        let res = T::Response::deserialize(response)?;
        self.0.skip(&req, &res)
    }
}
