//! Outbound request description.
//!
//! # Responsibilities
//! - Describe one call (method, path, query, JSON body) independent of transport
//! - Stay cheap to clone so every retry attempt rebuilds a fresh request
//! - Generate the per-attempt request ID

use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

/// Header carrying the per-attempt correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier attached to every outbound attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A transport-agnostic description of one outbound call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the client's base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            json: None,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            json: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}
