//! Retry loop: run one logical request until it succeeds or the budget runs out.

use std::sync::Arc;

use tracing::{debug, warn};

use super::policy::{DEFAULT_RETRY_BUDGET, RetryPolicy};
use crate::domain::{ApiRequest, ApiResponse, AttemptOutcome, TransportError};
use crate::ports::Transport;

/// Executes a request with bounded retries and exponential backoff.
///
/// - At most `retry_budget + 1` transport calls.
/// - A response with status >= 300 on the last attempt is returned, not raised.
/// - A transport error on the last attempt is returned as `Err`.
#[derive(Clone)]
pub struct RetryExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    default_budget: u32,
}

impl RetryExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::standard(),
            default_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_default_budget(mut self, default_budget: u32) -> Self {
        self.default_budget = default_budget;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn default_budget(&self) -> u32 {
        self.default_budget
    }

    pub async fn execute(
        &self,
        request: &ApiRequest,
        retry_budget: Option<u32>,
    ) -> Result<ApiResponse, TransportError> {
        if request.url.trim().is_empty() {
            return Err(TransportError::InvalidRequest("url must not be empty".to_string()));
        }

        let retry_budget = retry_budget.unwrap_or(self.default_budget);
        let mut attempt = 0_u32;

        loop {
            debug!(url = %request.url, method = %request.method(), attempt, "sending attempt");
            let result = self.transport.fetch(request).await;
            let outcome = AttemptOutcome::classify(&result);

            if !outcome.is_retryable() || attempt >= retry_budget {
                match &result {
                    Ok(response) if outcome.is_retryable() => warn!(
                        url = %request.url,
                        status = response.status,
                        attempts = attempt + 1,
                        "retry budget exhausted; delivering unsuccessful response"
                    ),
                    Err(err) => warn!(
                        url = %request.url,
                        attempts = attempt + 1,
                        error = %err,
                        "retry budget exhausted; transport failure"
                    ),
                    Ok(response) => debug!(
                        url = %request.url,
                        status = response.status,
                        attempts = attempt + 1,
                        "request succeeded"
                    ),
                }
                return result;
            }

            let delay = self.policy.next_delay(attempt);
            match &result {
                Ok(response) => warn!(
                    url = %request.url,
                    status = response.status,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "unsuccessful status; scheduling retry"
                ),
                Err(err) => warn!(
                    url = %request.url,
                    error = %err,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "transport failure; scheduling retry"
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestOptions;
    use crate::impls::{ScriptedStep, ScriptedTransport};
    use rstest::rstest;
    use std::time::Duration;

    fn executor(transport: &Arc<ScriptedTransport>) -> RetryExecutor {
        RetryExecutor::new(Arc::clone(transport) as Arc<dyn Transport>)
    }

    fn get(url: &str) -> ApiRequest {
        ApiRequest::new(url, RequestOptions::get())
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_try_makes_one_call() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(200)));

        let response = executor(&transport).execute(&get("/x"), None).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_500_is_delivered_after_budget() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(500)));

        let response = executor(&transport)
            .execute(&get("/x"), Some(2))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(
            transport.start_offsets(),
            vec![
                Duration::ZERO,
                Duration::from_millis(1_000),
                Duration::from_millis(3_000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_transport_failure_is_raised() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fallback(ScriptedStep::fail(TransportError::Connect("refused".to_string()))),
        );

        let err = executor(&transport)
            .execute(&get("/x"), Some(1))
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Connect("refused".to_string()));
        assert_eq!(
            transport.start_offsets(),
            vec![Duration::ZERO, Duration::from_millis(1_000)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("/x", ScriptedStep::fail(TransportError::Timeout))
                .respond("/x", ScriptedStep::status(503))
                .respond("/x", ScriptedStep::status(201)),
        );

        let response = executor(&transport)
            .execute(&get("/x"), Some(5))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(transport.call_count(), 3);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    #[tokio::test(start_paused = true)]
    async fn never_exceeds_budget_plus_one_calls(#[case] budget: u32) {
        let transport = Arc::new(
            ScriptedTransport::new().fallback(ScriptedStep::fail(TransportError::Timeout)),
        );

        let _ = executor(&transport).execute(&get("/x"), Some(budget)).await;

        assert_eq!(transport.call_count(), budget as usize + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_before_attempt_i_is_doubling() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(502)));

        let _ = executor(&transport).execute(&get("/x"), Some(4)).await;

        let offsets = transport.start_offsets();
        let gaps: Vec<Duration> = offsets.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(1_000),
                Duration::from_millis(2_000),
                Duration::from_millis(4_000),
                Duration::from_millis(8_000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn default_budget_applies_when_unset() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(500)));

        let _ = executor(&transport)
            .with_default_budget(1)
            .execute(&get("/x"), None)
            .await;

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_url_is_rejected_without_calling_transport() {
        let transport = Arc::new(ScriptedTransport::new().fallback(ScriptedStep::status(200)));

        let err = executor(&transport).execute(&get("  "), None).await.unwrap_err();

        assert!(matches!(err, TransportError::InvalidRequest(_)));
        assert_eq!(transport.call_count(), 0);
    }
}
