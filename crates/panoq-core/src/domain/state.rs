//! Request state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of one queued request.
///
/// State transitions:
/// - Buffered -> Dispatched -> Fulfilled
/// - Buffered -> Dispatched -> Rejected
///
/// No transition leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Waiting in the FIFO.
    Buffered,

    /// Handed to the retry executor; occupies a concurrency slot.
    Dispatched,

    /// Settled with a response (any status).
    Fulfilled,

    /// Settled with an error.
    Rejected,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Fulfilled | RequestState::Rejected)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Buffered, RequestState::Dispatched)
                | (RequestState::Dispatched, RequestState::Fulfilled)
                | (RequestState::Dispatched, RequestState::Rejected)
        )
    }
}
