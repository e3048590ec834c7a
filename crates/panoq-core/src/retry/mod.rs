//! Retry-Timeout wrapper.
//!
//! Executes one logical request with bounded retries and exponential backoff,
//! hiding transient failures from the caller when possible.
//!
//! Status >= 300 and transport failures are both retried; only a transport
//! failure on the final attempt becomes an error.

mod executor;
mod policy;

pub use executor::RetryExecutor;
pub use policy::{DEFAULT_RETRY_BUDGET, RetryPolicy};
