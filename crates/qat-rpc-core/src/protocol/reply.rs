//! Replies: a string-keyed JSON object.
//!
//! Success replies carry domain keys (`results`, `qat_rpc_version`, ...).
//! Failure replies carry exactly one key, [`EXCEPTION_KEY`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RpcError;

pub const EXCEPTION_KEY: &str = "Exception";
pub const RESULTS_KEY: &str = "results";
pub const EXECUTION_METRICS_KEY: &str = "execution_metrics";
pub const VERSION_KEY: &str = "qat_rpc_version";
pub const COUPLINGS_KEY: &str = "couplings";
pub const QPU_INFO_KEY: &str = "qpu_info";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(Map<String, Value>);

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn exception(err: &RpcError) -> Self {
        Self::new().with(EXCEPTION_KEY, err.repr())
    }

    pub fn is_exception(&self) -> bool {
        self.0.contains_key(EXCEPTION_KEY)
    }

    /// The exception text, if this is a failure reply.
    pub fn exception_text(&self) -> Option<&str> {
        self.0.get(EXCEPTION_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl std::ops::Index<&str> for Reply {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        &self.0[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_reply_has_single_key() {
        let reply = Reply::exception(&RpcError::NotImplemented("qubit info".into()));
        assert!(reply.is_exception());
        assert_eq!(reply.keys().collect::<Vec<_>>(), vec![EXCEPTION_KEY]);
        assert_eq!(reply.exception_text(), Some("NotImplementedError('qubit info')"));
    }

    #[test]
    fn success_reply_serializes_as_object() {
        let reply = Reply::new().with(VERSION_KEY, "0.1.0");
        let s = serde_json::to_string(&reply).expect("serialize");
        assert_eq!(s, r#"{"qat_rpc_version":"0.1.0"}"#);
        assert!(!reply.is_exception());
        assert_eq!(reply[VERSION_KEY], "0.1.0");
    }
}
