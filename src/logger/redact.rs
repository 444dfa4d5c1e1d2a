//! Field redaction for emitted records.
//!
//! Paths are dotted keys into the serialized record. A `*` segment matches
//! every key of an object or every element of an array at that depth.
//!
//! ```text
//! http.req.headers.authorization
//! http.req.body.*.card
//! ```

use serde_json::Value;

use crate::config::RedactConfig;

/// Default replacement for redacted values.
pub const DEFAULT_CENSOR: &str = "***";

/// Compiled redaction rules.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    paths: Vec<Vec<String>>,
    censor: String,
    remove: bool,
}

impl Redactor {
    pub fn new<I, S>(paths: I, censor: impl Into<String>, remove: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| p.as_ref().split('.').map(str::to_string).collect())
                .collect(),
            censor: censor.into(),
            remove,
        }
    }

    pub fn from_config(config: &RedactConfig) -> Self {
        Self::new(&config.fields, config.censor.clone(), config.remove)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Censor or remove every configured path present in `value`.
    pub fn apply(&self, value: &mut Value) {
        for path in &self.paths {
            self.apply_path(value, path);
        }
    }

    fn apply_path(&self, value: &mut Value, path: &[String]) {
        let Some((head, rest)) = path.split_first() else {
            return;
        };

        if rest.is_empty() {
            self.redact_leaf(value, head);
            return;
        }

        match value {
            Value::Object(map) if head == "*" => {
                for child in map.values_mut() {
                    self.apply_path(child, rest);
                }
            }
            Value::Array(items) if head == "*" => {
                for child in items.iter_mut() {
                    self.apply_path(child, rest);
                }
            }
            Value::Object(map) => {
                if let Some(child) = map.get_mut(head.as_str()) {
                    self.apply_path(child, rest);
                }
            }
            Value::Array(items) => {
                if let Some(child) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    self.apply_path(child, rest);
                }
            }
            _ => {}
        }
    }

    fn redact_leaf(&self, value: &mut Value, key: &str) {
        match value {
            Value::Object(map) if key == "*" => {
                if self.remove {
                    map.clear();
                } else {
                    for v in map.values_mut() {
                        *v = Value::String(self.censor.clone());
                    }
                }
            }
            Value::Object(map) => {
                if self.remove {
                    map.remove(key);
                } else if let Some(v) = map.get_mut(key) {
                    *v = Value::String(self.censor.clone());
                }
            }
            Value::Array(items) if key == "*" => {
                if self.remove {
                    items.clear();
                } else {
                    for v in items.iter_mut() {
                        *v = Value::String(self.censor.clone());
                    }
                }
            }
            _ => {}
        }
    }
}
