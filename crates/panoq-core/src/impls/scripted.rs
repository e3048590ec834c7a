//! ScriptedTransport - 決め打ちの応答を返す開発用 Transport
//!
//! # 学習ポイント
//! - URL ごとの応答キュー + fallback
//! - 呼び出し開始時刻の記録（tokio の時計なので paused time でも決定的）
//! - 同時実行数のピーク計測

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::{ApiRequest, ApiResponse, TransportError};
use crate::ports::Transport;

/// One scripted reaction: optional latency, then a response or an error.
#[derive(Debug, Clone)]
pub struct ScriptedStep {
    latency: Duration,
    result: Result<ApiResponse, TransportError>,
}

impl ScriptedStep {
    pub fn status(status: u16) -> Self {
        Self::respond(ApiResponse::new(status))
    }

    pub fn respond(response: ApiResponse) -> Self {
        Self {
            latency: Duration::ZERO,
            result: Ok(response),
        }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::respond(
            ApiResponse::new(status)
                .with_header("content-type", "application/json")
                .with_body(body.to_string()),
        )
    }

    pub fn fail(error: TransportError) -> Self {
        Self {
            latency: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// A call the transport has seen.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ApiRequest,
    pub started_at: Instant,
}

/// Replays scripted steps per URL, falling back to a default step.
///
/// Without a matching step or fallback the call fails with
/// `TransportError::Other("no scripted response ...")`.
pub struct ScriptedTransport {
    created_at: Instant,
    scripts: Mutex<HashMap<String, VecDeque<ScriptedStep>>>,
    fallback: Option<ScriptedStep>,
    calls: Mutex<Vec<RecordedCall>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            created_at: Instant::now(),
            scripts: Mutex::new(HashMap::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Queue `step` as the next reaction for `url`.
    pub fn respond(self, url: impl Into<String>, step: ScriptedStep) -> Self {
        lock(&self.scripts)
            .entry(url.into())
            .or_default()
            .push_back(step);
        self
    }

    /// Reaction used once a URL's own steps run out.
    pub fn fallback(mut self, step: ScriptedStep) -> Self {
        self.fallback = Some(step);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn called_urls(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|call| call.request.url.clone())
            .collect()
    }

    /// Start time of each call relative to construction.
    pub fn start_offsets(&self) -> Vec<Duration> {
        lock(&self.calls)
            .iter()
            .map(|call| call.started_at.duration_since(self.created_at))
            .collect()
    }

    /// Highest number of overlapping calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_step(&self, url: &str) -> Option<ScriptedStep> {
        let scripted = lock(&self.scripts)
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        scripted.or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        lock(&self.calls).push(RecordedCall {
            request: request.clone(),
            started_at: Instant::now(),
        });
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let step = self.next_step(&request.url);
        let result = match step {
            Some(step) => {
                if !step.latency.is_zero() {
                    tokio::time::sleep(step.latency).await;
                }
                step.result
            }
            None => Err(TransportError::Other(format!(
                "no scripted response for {}",
                request.url
            ))),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
