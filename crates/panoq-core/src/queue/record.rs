//! Queued request: parameters + the caller's completion handle.

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::domain::{ApiRequest, ApiResponse, RequestError, RequestId, RequestState};

pub(crate) type Settlement = Result<ApiResponse, RequestError>;

/// One pending call, owned by the dispatcher from intake until settlement.
///
/// Design:
/// - `responder` is consumed by `settle`, so a request settles at most once.
/// - The dispatcher settles every request it pops, so it settles exactly once.
#[derive(Debug)]
pub(crate) struct QueuedRequest {
    pub(crate) id: RequestId,
    pub(crate) request: ApiRequest,
    pub(crate) retry_budget: Option<u32>,
    pub(crate) state: RequestState,
    pub(crate) enqueued_at: Instant,
    responder: oneshot::Sender<Settlement>,
}

impl QueuedRequest {
    pub(crate) fn new(
        id: RequestId,
        request: ApiRequest,
        retry_budget: Option<u32>,
        responder: oneshot::Sender<Settlement>,
    ) -> Self {
        Self {
            id,
            request,
            retry_budget,
            state: RequestState::Buffered,
            enqueued_at: Instant::now(),
            responder,
        }
    }

    /// Buffered -> Dispatched.
    pub(crate) fn mark_dispatched(&mut self) {
        debug_assert!(self.state.can_transition_to(RequestState::Dispatched));
        self.state = RequestState::Dispatched;
    }

    /// Dispatched -> Fulfilled | Rejected. Returns the terminal state.
    ///
    /// A dropped `ResponseFuture` is not an error: the result is discarded.
    pub(crate) fn settle(self, settlement: Settlement) -> RequestState {
        let terminal = if settlement.is_ok() {
            RequestState::Fulfilled
        } else {
            RequestState::Rejected
        };
        debug_assert!(self.state.can_transition_to(terminal));
        let _ = self.responder.send(settlement);
        terminal
    }

    /// Settle a request that never made it into the FIFO.
    pub(crate) fn reject_unaccepted(self) {
        let _ = self.responder.send(Err(RequestError::QueueClosed));
    }
}
