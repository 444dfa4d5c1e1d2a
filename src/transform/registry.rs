//! Endpoint → transformer registry.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use super::BodyLogTransformer;

/// Identity of a route handler: owner type + handler name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey(String);

impl EndpointKey {
    /// Key for `method` on `owner`, joined as `"{owner}-{method}"`.
    pub fn new(owner: &str, method: &str) -> Self {
        Self(format!("{owner}-{method}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared store of per-endpoint transformers.
///
/// Populated while the application is being assembled, then only read by
/// in-flight requests. Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    inner: Arc<DashMap<EndpointKey, Arc<dyn BodyLogTransformer>>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `transformer` under `key`, replacing any previous registration.
    ///
    /// Returns the replaced transformer, if there was one.
    pub fn register<T>(
        &self,
        key: EndpointKey,
        transformer: T,
    ) -> Option<Arc<dyn BodyLogTransformer>>
    where
        T: BodyLogTransformer,
    {
        let previous = self.inner.insert(key.clone(), Arc::new(transformer));
        if previous.is_some() {
            tracing::warn!(endpoint = %key, "Body log transformer replaced");
        } else {
            tracing::debug!(endpoint = %key, "Body log transformer registered");
        }
        previous
    }

    /// Register for the handler `method` of `owner`.
    pub fn register_transformer<T>(&self, owner: &str, method: &str, transformer: T) -> &Self
    where
        T: BodyLogTransformer,
    {
        self.register(EndpointKey::new(owner, method), transformer);
        self
    }

    /// Transformer registered for `key`.
    pub fn lookup(&self, key: &EndpointKey) -> Option<Arc<dyn BodyLogTransformer>> {
        self.inner.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.inner.iter().map(|e| e.key().to_string()).collect();
        keys.sort();
        f.debug_struct("TransformerRegistry").field("endpoints", &keys).finish()
    }
}
