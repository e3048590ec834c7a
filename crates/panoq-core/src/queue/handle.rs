//! RequestQueue - the public handle callers share.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::dispatcher::Dispatcher;
use super::record::{QueuedRequest, Settlement};
use crate::config::GovernorConfig;
use crate::domain::{ApiRequest, ApiResponse, RequestError, RequestId, RequestOptions};
use crate::observability::{QueueCounters, QueueStats};
use crate::ports::{IdGenerator, SystemClock, Transport, UlidGenerator};
use crate::retry::RetryExecutor;

/// Default number of requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// Handle to a running request queue.
///
/// - Cheap to clone; every clone feeds the same dispatcher.
/// - Must be created inside a tokio runtime (spawns the dispatcher task).
/// - Dropping every clone lets the dispatcher finish buffered work and exit.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

struct Inner {
    intake: mpsc::UnboundedSender<QueuedRequest>,
    shutdown_tx: watch::Sender<bool>,
    join: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<QueueCounters>,
    ids: Arc<dyn IdGenerator>,
    max_concurrency: usize,
}

impl RequestQueue {
    /// Spawn a dispatcher with `max_concurrency` slots (0 is treated as 1).
    pub fn new(executor: RetryExecutor, max_concurrency: usize) -> Self {
        Self::with_id_generator(
            executor,
            max_concurrency,
            Arc::new(UlidGenerator::new(SystemClock)),
        )
    }

    pub fn with_id_generator(
        executor: RetryExecutor,
        max_concurrency: usize,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(QueueCounters::default());

        let dispatcher = Dispatcher {
            intake: intake_rx,
            shutdown_rx,
            executor: Arc::new(executor),
            counters: Arc::clone(&counters),
            max_concurrency,
        };
        let join = tokio::spawn(dispatcher.run());

        Self {
            inner: Arc::new(Inner {
                intake: intake_tx,
                shutdown_tx,
                join: Mutex::new(Some(join)),
                counters,
                ids,
                max_concurrency,
            }),
        }
    }

    /// Build the executor and queue described by `config` over `transport`.
    pub fn from_config(config: &GovernorConfig, transport: Arc<dyn Transport>) -> Self {
        let executor = RetryExecutor::new(transport)
            .with_policy(config.retry_policy())
            .with_default_budget(config.default_retry_budget);
        Self::new(executor, config.max_concurrency)
    }

    /// Submit a request. Returns immediately; the future settles once the
    /// request has been executed (or refused if the queue is shut down).
    ///
    /// A delivered response with status >= 300 is a fulfillment, not an error.
    pub fn enqueue(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
        retry_budget: Option<u32>,
    ) -> ResponseFuture {
        self.submit(ApiRequest::new(url, options), retry_budget)
    }

    pub fn submit(&self, request: ApiRequest, retry_budget: Option<u32>) -> ResponseFuture {
        let id = self.inner.ids.generate_request_id();
        let (responder, receiver) = oneshot::channel();
        let queued = QueuedRequest::new(id, request, retry_budget, responder);

        self.inner.counters.record_enqueued();
        if let Err(mpsc::error::SendError(refused)) = self.inner.intake.send(queued) {
            self.inner.counters.record_refused();
            debug!(request_id = %id, "queue closed; refusing request");
            refused.reject_unaccepted();
        }

        ResponseFuture { id, receiver }
    }

    /// Requests buffered but not yet dispatched.
    pub fn queue_length(&self) -> usize {
        self.inner.counters.queued()
    }

    /// Requests dispatched and not yet settled.
    pub fn active_requests(&self) -> usize {
        self.inner.counters.in_flight()
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.counters.snapshot(self.inner.max_concurrency)
    }

    /// Stop accepting new requests. Buffered and in-flight requests still run.
    pub fn request_shutdown(&self) {
        // ignore send error: the dispatcher may already be gone
        let _ = self.inner.shutdown_tx.send(true);
    }

    /// Shutdown and wait for the dispatcher to drain.
    ///
    /// Only the first caller waits; later calls return once shutdown is requested.
    pub async fn shutdown_and_join(&self) {
        self.request_shutdown();
        let join = {
            let mut guard = match self.inner.join.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take()
        };
        if let Some(join) = join {
            let _ = join.await;
        }
    }
}

/// Future returned by [`RequestQueue::enqueue`].
///
/// Dropping it does not withdraw the request.
#[derive(Debug)]
pub struct ResponseFuture {
    id: RequestId,
    receiver: oneshot::Receiver<Settlement>,
}

impl ResponseFuture {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<ApiResponse, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RequestError::QueueClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportError;
    use crate::impls::{ScriptedStep, ScriptedTransport};
    use rstest::rstest;
    use std::time::Duration;

    fn queue(transport: &Arc<ScriptedTransport>, max_concurrency: usize) -> RequestQueue {
        let executor = RetryExecutor::new(Arc::clone(transport) as Arc<dyn Transport>);
        RequestQueue::new(executor, max_concurrency)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_waits_for_the_first_with_one_slot() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("/a", ScriptedStep::status(200).after(ms(500)))
                .respond("/b", ScriptedStep::status(200)),
        );
        let queue = queue(&transport, 1);

        let a = queue.enqueue("/a", RequestOptions::get(), None);
        let b = queue.enqueue("/b", RequestOptions::get(), None);
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(transport.called_urls(), vec!["/a", "/b"]);
        let offsets = transport.start_offsets();
        assert_eq!(offsets[0], Duration::ZERO);
        assert!(offsets[1] >= ms(500));
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[tokio::test(start_paused = true)]
    async fn never_exceeds_max_concurrency(#[case] max_concurrency: usize) {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::status(200).after(ms(100))),
        );
        let queue = queue(&transport, max_concurrency);

        let pending: Vec<_> = (0..8)
            .map(|i| queue.enqueue(format!("/img/{i}"), RequestOptions::get(), None))
            .collect();
        let results = futures::future::join_all(pending).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(transport.call_count(), 8);
        assert_eq!(transport.peak_concurrency(), max_concurrency);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_start_in_submission_order() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("/a", ScriptedStep::status(200).after(ms(300)))
                .respond("/b", ScriptedStep::status(200).after(ms(100)))
                .respond("/c", ScriptedStep::status(200))
                .respond("/d", ScriptedStep::status(200)),
        );
        let queue = queue(&transport, 2);

        let pending: Vec<_> = ["/a", "/b", "/c", "/d"]
            .into_iter()
            .map(|url| queue.enqueue(url, RequestOptions::get(), None))
            .collect();
        futures::future::join_all(pending).await;

        assert_eq!(transport.called_urls(), vec!["/a", "/b", "/c", "/d"]);
        let offsets = transport.start_offsets();
        assert_eq!(offsets[2], ms(100));
        assert_eq!(offsets[3], ms(100));
    }

    #[tokio::test(start_paused = true)]
    async fn unsuccessful_status_fulfills_and_transport_failure_rejects() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("/broken", ScriptedStep::status(500))
                .respond(
                    "/down",
                    ScriptedStep::fail(TransportError::Connect("refused".into())),
                ),
        );
        let queue = queue(&transport, 1);

        let broken = queue.enqueue("/broken", RequestOptions::get(), Some(0)).await;
        let down = queue.enqueue("/down", RequestOptions::get(), Some(0)).await;

        assert_eq!(broken.unwrap().status, 500);
        assert!(matches!(
            down,
            Err(RequestError::Transport(TransportError::Connect(_)))
        ));
        let stats = queue.stats();
        assert_eq!((stats.fulfilled, stats.rejected), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn diagnostics_report_buffered_and_active_counts() {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::status(200).after(ms(100))),
        );
        let queue = queue(&transport, 1);
        assert_eq!((queue.queue_length(), queue.active_requests()), (0, 0));

        let pending: Vec<_> = (0..3)
            .map(|i| queue.enqueue(format!("/img/{i}"), RequestOptions::get(), None))
            .collect();
        tokio::time::sleep(ms(1)).await;

        assert_eq!((queue.queue_length(), queue.active_requests()), (2, 1));

        futures::future::join_all(pending).await;
        assert_eq!(
            queue.stats(),
            QueueStats {
                queued: 0,
                in_flight: 0,
                fulfilled: 3,
                rejected: 0,
                max_concurrency: 1,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_buffered_requests_then_refuses_new_ones() {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::status(200).after(ms(50))),
        );
        let queue = queue(&transport, 1);

        let first = queue.enqueue("/one", RequestOptions::get(), None);
        let second = queue.enqueue("/two", RequestOptions::get(), None);
        queue.shutdown_and_join().await;

        assert_eq!(first.await.unwrap().status, 200);
        assert_eq!(second.await.unwrap().status, 200);

        let late = queue.enqueue("/three", RequestOptions::get(), None).await;
        assert!(matches!(late, Err(RequestError::QueueClosed)));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(queue.queue_length(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_still_settles_pending_requests() {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::status(204).after(ms(10))),
        );
        let queue = queue(&transport, 1);

        let pending = queue.enqueue("/img", RequestOptions::get(), None);
        drop(queue);

        assert_eq!(pending.await.unwrap().status, 204);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_concurrency_is_clamped_to_one() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(200)));
        let queue = queue(&transport, 0);

        assert_eq!(queue.max_concurrency(), 1);
        assert!(queue.enqueue("/img", RequestOptions::get(), None).await.is_ok());
    }

    #[tokio::test]
    async fn each_submission_gets_a_distinct_id() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(200)));
        let queue = queue(&transport, 1);

        let a = queue.enqueue("/a", RequestOptions::get(), None);
        let b = queue.enqueue("/b", RequestOptions::get(), None);

        assert_ne!(a.id(), b.id());
        assert!(a.id().to_string().starts_with("req-"));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_500_is_fulfilled_after_the_full_backoff_schedule() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(500)));
        let queue = queue(&transport, 1);

        let response = queue
            .enqueue("/broken", RequestOptions::get(), Some(2))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(transport.start_offsets(), vec![ms(0), ms(1_000), ms(3_000)]);
        assert_eq!(queue.stats().fulfilled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_transport_failure_is_rejected_after_retries() {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::fail(TransportError::Timeout)),
        );
        let queue = queue(&transport, 1);

        let result = queue.enqueue("/down", RequestOptions::get(), Some(1)).await;

        assert!(matches!(
            result,
            Err(RequestError::Transport(TransportError::Timeout))
        ));
        assert_eq!(transport.start_offsets(), vec![ms(0), ms(1_000)]);
        assert_eq!(queue.stats().rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn head_in_backoff_keeps_later_requests_buffered() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("/flaky", ScriptedStep::status(503))
                .respond("/flaky", ScriptedStep::status(200))
                .respond("/next", ScriptedStep::status(200)),
        );
        let queue = queue(&transport, 1);

        let flaky = queue.enqueue("/flaky", RequestOptions::get(), Some(1));
        let next = queue.enqueue("/next", RequestOptions::get(), None);
        tokio::time::sleep(ms(500)).await;

        assert_eq!((queue.queue_length(), queue.active_requests()), (1, 1));
        assert_eq!(transport.call_count(), 1);

        assert_eq!(flaky.await.unwrap().status, 200);
        assert_eq!(next.await.unwrap().status, 200);
        assert_eq!(transport.called_urls(), vec!["/flaky", "/flaky", "/next"]);
        assert_eq!(transport.start_offsets()[2], ms(1_000));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn settled_request_is_no_longer_counted_as_active() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(200)));
        let queue = queue(&transport, 1);

        for settled in 1..=500 {
            queue
                .enqueue("/img", RequestOptions::get(), None)
                .await
                .unwrap();

            assert_eq!(queue.active_requests(), 0);
            assert_eq!(queue.stats().fulfilled, settled);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submitters_share_the_concurrency_limit() {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::status(200).after(ms(2))),
        );
        let queue = queue(&transport, 2);

        let submitters: Vec<_> = (0..8)
            .map(|task| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let pending: Vec<_> = (0..5)
                        .map(|i| queue.enqueue(format!("/t{task}/{i}"), RequestOptions::get(), None))
                        .collect();
                    futures::future::join_all(pending).await
                })
            })
            .collect();

        for submitter in futures::future::join_all(submitters).await {
            assert!(submitter.unwrap().iter().all(Result::is_ok));
        }
        assert_eq!(transport.call_count(), 40);
        assert!(transport.peak_concurrency() <= 2);
        let stats = queue.stats();
        assert_eq!((stats.fulfilled, stats.queued, stats.in_flight), (40, 0, 0));
    }
}
