//! JSON test vector loader for message shape tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub message: serde_json::Value,
    #[serde(default)]
    pub expect: Option<ExpectMessage>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectMessage {
    pub kind: String,
    pub legacy: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
}

impl TestVector {
    /// The positional tuple carried by the vector.
    pub fn items(&self) -> Vec<serde_json::Value> {
        match &self.message {
            serde_json::Value::Array(items) => items.clone(),
            other => panic!("vector message must be an array, got {other}"),
        }
    }
}
