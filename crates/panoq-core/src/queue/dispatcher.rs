//! Dispatcher - the single consumer of the request FIFO.
//!
//! One tokio task owns the FIFO and every in-flight execution. In-flight
//! executions live in a `FuturesUnordered` polled by this same task, so
//! there is no parallelism between request bodies, only interleaving at
//! `.await` points.
//!
//! Loop:
//! 1. fill free slots from the FIFO head (FIFO start order)
//! 2. wait for either a new submission, a settled execution, or shutdown
//! 3. repeat until intake is closed and nothing is buffered or in flight

use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::record::QueuedRequest;
use crate::observability::QueueCounters;
use crate::retry::RetryExecutor;

pub(crate) struct Dispatcher {
    pub(crate) intake: mpsc::UnboundedReceiver<QueuedRequest>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
    pub(crate) executor: Arc<RetryExecutor>,
    pub(crate) counters: Arc<QueueCounters>,
    pub(crate) max_concurrency: usize,
}

impl Dispatcher {
    pub(crate) async fn run(self) {
        let Dispatcher {
            mut intake,
            mut shutdown_rx,
            executor,
            counters,
            max_concurrency,
        } = self;

        let mut fifo: VecDeque<QueuedRequest> = VecDeque::new();
        let mut in_flight = FuturesUnordered::new();
        let mut intake_open = true;
        let mut shutdown_seen = false;

        loop {
            while in_flight.len() < max_concurrency {
                let Some(mut queued) = fifo.pop_front() else {
                    break;
                };
                queued.mark_dispatched();
                counters.record_dispatched();
                debug!(
                    request_id = %queued.id,
                    url = %queued.request.url,
                    waited_ms = u64::try_from(queued.enqueued_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                    in_flight = in_flight.len() + 1,
                    "dispatching request"
                );
                in_flight.push(run_one(Arc::clone(&executor), Arc::clone(&counters), queued));
            }

            if !intake_open && fifo.is_empty() && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                received = intake.recv(), if intake_open => match received {
                    Some(queued) => fifo.push_back(queued),
                    // every handle is gone; drain what we have
                    None => intake_open = false,
                },
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
                changed = shutdown_rx.changed(), if !shutdown_seen => {
                    if changed.is_err() || *shutdown_rx.borrow_and_update() {
                        shutdown_seen = true;
                        // already-sent submissions stay receivable
                        intake.close();
                    }
                }
            }
        }

        info!("request queue dispatcher stopped");
    }
}

/// Execute one request and settle its future.
async fn run_one(executor: Arc<RetryExecutor>, counters: Arc<QueueCounters>, queued: QueuedRequest) {
    let result = executor.execute(&queued.request, queued.retry_budget).await;
    let id = queued.id;
    // counters first: a woken caller must not observe its own request in flight
    counters.record_settled(result.is_ok());
    let terminal = queued.settle(result.map_err(Into::into));
    debug!(request_id = %id, state = ?terminal, "request settled");
}
