//! Outcome model: classification of a single transport attempt.
//!
//! The retry layer only needs to know which of three buckets an attempt fell
//! into; it never looks at bodies or headers.

use serde::{Deserialize, Serialize};

use super::errors::TransportError;
use super::response::{ApiResponse, SUCCESS_STATUS_LIMIT};

/// A unified classification of an attempt result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    /// Response with status < 300. Returned immediately.
    Success,

    /// Response with status >= 300. Retried while budget remains, otherwise
    /// delivered to the caller unchanged.
    RetryableHttp,

    /// The transport itself failed. Retried while budget remains, otherwise
    /// propagated as an error.
    TransportFailure,
}

impl AttemptOutcome {
    pub fn classify(result: &Result<ApiResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.status < SUCCESS_STATUS_LIMIT => Self::Success,
            Ok(_) => Self::RetryableHttp,
            Err(_) => Self::TransportFailure,
        }
    }

    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Success)
    }
}
