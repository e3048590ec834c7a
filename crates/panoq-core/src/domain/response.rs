//! Response-shaped value handed back to callers.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

/// Status codes below this bound count as success; everything else is
/// retried by the retry layer and, if it persists, delivered as-is.
pub const SUCCESS_STATUS_LIMIT: u16 = 300;

/// What the transport observed for one delivered HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Same split as `fetch`'s `Response.ok`: 2xx only.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        self.status < SUCCESS_STATUS_LIMIT
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
