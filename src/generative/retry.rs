//! Bounded retry loop around the generative endpoint.
//!
//! Each call runs through the states
//! `ATTEMPTING(k) → SUCCESS(records) | RETRY(k+1) | EXHAUSTED`, starting at
//! `ATTEMPTING(1)`. `EXHAUSTED` is reported to the caller as an empty list:
//! the loop never returns an error, only diagnostics.
use crate::generative::prompt::build_prompt;
use crate::generative::prompt::parse_reply;
use crate::generative::prompt::ReplyError;
use crate::generative::GenerativeClient;
use crate::generative::GenerativeError;
use crate::generative::SamplingParams;
use crate::ocr::OcrResponse;
use crate::ocr::PayloadSummary;
use crate::schedule::ShiftRecord;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Why one attempt produced no shifts.
#[derive(Error, Debug)]
pub enum AttemptFailure {
    #[error("{0}")]
    Endpoint(#[from] GenerativeError),

    #[error("{0}")]
    Reply(#[from] ReplyError),
}

impl AttemptFailure {
    /// Transport errors and timeouts wait before the next attempt; bad replies do not.
    fn needs_backoff(&self) -> bool {
        matches!(self, Self::Endpoint(_))
    }
}

/// Attempt budget, per-attempt timeout and the sampling perturbation schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub request_timeout: Duration,
    /// Backoff after failed attempt `k` is `min(backoff_step * k, backoff_cap)`
    pub backoff_step: Duration,
    pub backoff_cap: Duration,
    pub seed_step: i32,
    pub temperature_step: f32,
    pub temperature_cap: f32,
    pub top_p_step: f32,
    pub top_p_cap: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(30),
            backoff_step: Duration::from_millis(1000),
            backoff_cap: Duration::from_millis(5000),
            seed_step: 1000,
            temperature_step: 0.1,
            temperature_cap: 1.0,
            top_p_step: 0.05,
            top_p_cap: 0.95,
        }
    }
}

impl RetryPolicy {
    /// Sampling controls for the 1-based `attempt`.
    ///
    /// Attempt 1 uses the base values. Later attempts move seed, temperature
    /// and nucleus threshold up linearly; the last two stop at their caps but
    /// never drop below the base.
    pub fn params_for(&self, base: &SamplingParams, attempt: u32) -> SamplingParams {
        let step = attempt.saturating_sub(1);
        let raise = |value: f32, increment: f32, cap: f32| (value + increment * step as f32).min(cap.max(value));
        SamplingParams {
            seed: base.seed.wrapping_add(self.seed_step.wrapping_mul(i32::try_from(step).unwrap_or(i32::MAX))),
            temperature: raise(base.temperature, self.temperature_step, self.temperature_cap),
            top_p: raise(base.top_p, self.top_p_step, self.top_p_cap),
        }
    }

    /// Delay before the attempt following failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        (self.backoff_step * attempt).min(self.backoff_cap)
    }
}

/// Shared flag that stops further attempts once set.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Diagnostics of one prompt/parse cycle.
#[derive(Debug)]
pub struct ExtractionAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    pub params: SamplingParams,
    /// Raw completion text, None when the endpoint call failed
    pub reply: Option<String>,
    pub outcome: Result<Vec<ShiftRecord>, AttemptFailure>,
}

/// Result of a generative extraction together with its attempts.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub records: Vec<ShiftRecord>,
    pub attempts: Vec<ExtractionAttempt>,
    pub cancelled: bool,
}

impl ExtractionReport {
    /// The most recent failure, if the last attempt failed.
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.attempts.last().and_then(|attempt| attempt.outcome.as_ref().err())
    }
}

/// Generative extraction bound to one injected client.
pub struct ModelExtractor<'a> {
    client: &'a dyn GenerativeClient,
    params: SamplingParams,
    policy: RetryPolicy,
    cancel: Option<CancelFlag>,
}

impl<'a> ModelExtractor<'a> {
    pub fn new(client: &'a dyn GenerativeClient) -> Self {
        Self {
            client,
            params: SamplingParams::default(),
            policy: RetryPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(CancelFlag::is_cancelled).unwrap_or(false)
    }

    /// Extracts shifts, returning an empty list when every attempt fails.
    pub async fn extract(&self, payload: &serde_json::Value, name: &str, year: i32) -> Vec<ShiftRecord> {
        self.extract_with_report(payload, name, year).await.records
    }

    /// Extracts shifts and keeps every attempt for diagnostics.
    pub async fn extract_with_report(&self, payload: &serde_json::Value, name: &str, year: i32) -> ExtractionReport {
        if let Ok(response) = OcrResponse::from_value(payload) {
            let summary = PayloadSummary::scan(&response, name);
            debug!(
                cells = summary.cells,
                date_cells = summary.date_cells,
                target_cells = summary.target_cells,
                "Payload summary before generative extraction"
            );
        }

        let prompt = build_prompt(payload, name, year);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut report = ExtractionReport::default();

        for attempt in 1..=max_attempts {
            if self.is_cancelled() {
                info!(attempt, "Extraction cancelled, not starting another attempt");
                report.cancelled = true;
                return report;
            }

            let params = self.policy.params_for(&self.params, attempt);
            info!(
                attempt,
                max_attempts,
                seed = params.seed,
                temperature = params.temperature,
                top_p = params.top_p,
                "Requesting generative extraction"
            );
            let (reply, outcome) = self.attempt(&prompt, &params).await;

            match outcome {
                Ok(records) => {
                    info!(attempt, shifts = records.len(), "Generative extraction succeeded");
                    report.records = records.clone();
                    report.attempts.push(ExtractionAttempt { attempt, params, reply, outcome: Ok(records) });
                    return report;
                }
                Err(failure) => {
                    warn!(attempt, error = %failure, "Generative extraction attempt failed");
                    let backoff = failure.needs_backoff().then(|| self.policy.backoff(attempt));
                    report.attempts.push(ExtractionAttempt { attempt, params, reply, outcome: Err(failure) });
                    if let Some(delay) = backoff.filter(|_| attempt < max_attempts && !self.is_cancelled()) {
                        debug!(delay_ms = delay.as_millis() as u64, "Backing off before next attempt");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        if let Some(failure) = report.last_failure() {
            warn!(attempts = max_attempts, last_error = %failure, "Generative extraction exhausted, returning no shifts");
        }
        report
    }

    /// One endpoint call under the per-attempt timeout, followed by reply validation.
    async fn attempt(&self, prompt: &str, params: &SamplingParams) -> (Option<String>, Result<Vec<ShiftRecord>, AttemptFailure>) {
        let timeout = self.policy.request_timeout;
        let reply = match tokio::time::timeout(timeout, self.client.generate(prompt, params)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(error)) => return (None, Err(error.into())),
            Err(_) => return (None, Err(GenerativeError::Timeout(timeout.as_millis()).into())),
        };
        debug!(reply_chars = reply.chars().count(), "Generative reply received");
        let outcome = parse_reply(&reply).map_err(AttemptFailure::from);
        (Some(reply), outcome)
    }
}
