//! Retrying invocation of the generation service
//!
//! Quota and rate-limit failures are retried with exponential backoff plus
//! jitter; anything else is handed back to the caller on the first failure.

use std::time::Duration;

use rand::RngExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::generation::{GenerationRequest, GenerationService, ServiceError};

/// Status code signalling quota exhaustion / rate limiting
const QUOTA_STATUS: i64 = 429;

/// Message fragments that mark a quota failure, matched case-insensitively
const QUOTA_MARKERS: [&str; 3] = ["429", "quota", "exhausted"];

/// How a failed call is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Quota or rate limiting; worth retrying after a pause
    QuotaExceeded,
    Other,
}

/// Backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay unit; attempt `n` waits `2^(n+1)` units
    pub base_delay_ms: u64,
    /// Exclusive upper bound of the random jitter
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
            max_jitter_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after a failure on `attempt` (0-based)
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_add(1));
        Duration::from_millis(
            factor
                .saturating_mul(self.base_delay_ms)
                .saturating_add(jitter_ms),
        )
    }

    /// Random jitter in `[0, max_jitter_ms)`
    fn jitter_ms(&self) -> u64 {
        if self.max_jitter_ms == 0 {
            return 0;
        }
        rand::rng().random_range(0..self.max_jitter_ms)
    }
}

/// Failure surfaced once the retry policy gives up
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("quota exceeded after {retries} retries: {source}")]
    QuotaExceeded { retries: u32, source: ServiceError },

    #[error(transparent)]
    Other(ServiceError),
}

/// Decide whether a failure is a quota/rate-limit failure.
///
/// Any of these marks a quota failure: a transport status or error code of
/// 429, a numeric `code`/`status` of 429 anywhere in the structured error
/// body, or a message (top-level or nested `message` field) containing
/// "429", "quota" or "exhausted" in any letter case.
#[must_use]
pub fn classify(error: &ServiceError) -> FailureKind {
    let numeric = error.status.map(i64::from) == Some(QUOTA_STATUS)
        || error.code == Some(QUOTA_STATUS)
        || error.details.as_ref().is_some_and(body_has_quota_code);

    let textual = message_has_quota_marker(&error.message)
        || error.details.as_ref().is_some_and(body_has_quota_message);

    if numeric || textual {
        FailureKind::QuotaExceeded
    } else {
        FailureKind::Other
    }
}

fn message_has_quota_marker(message: &str) -> bool {
    let lowered = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn body_has_quota_code(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.iter().any(|(key, value)| {
            let is_code = (key == "code" || key == "status")
                && value.as_i64() == Some(QUOTA_STATUS);
            is_code || body_has_quota_code(value)
        }),
        Value::Array(items) => items.iter().any(body_has_quota_code),
        _ => false,
    }
}

fn body_has_quota_message(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.iter().any(|(key, value)| match value {
            Value::String(text) if key == "message" => message_has_quota_marker(text),
            other => body_has_quota_message(other),
        }),
        Value::Array(items) => items.iter().any(body_has_quota_message),
        _ => false,
    }
}

/// Call the service, retrying quota failures according to `policy`.
///
/// Attempts are numbered from 0. A quota failure on attempt `n < max_retries`
/// sleeps for [`RetryPolicy::backoff_delay`] and tries again; a quota failure
/// on attempt `max_retries` and every other failure is returned as is.
pub async fn invoke_with_retry<S>(
    service: &S,
    request: &GenerationRequest,
    policy: &RetryPolicy,
) -> Result<Option<String>, InvocationError>
where
    S: GenerationService + ?Sized,
{
    let mut attempt: u32 = 0;

    loop {
        debug!("Generation attempt {}", attempt);

        let error = match service.generate(request).await {
            Ok(payload) => return Ok(payload),
            Err(error) => error,
        };

        match classify(&error) {
            FailureKind::Other => return Err(InvocationError::Other(error)),
            FailureKind::QuotaExceeded if attempt >= policy.max_retries => {
                return Err(InvocationError::QuotaExceeded {
                    retries: attempt,
                    source: error,
                });
            }
            FailureKind::QuotaExceeded => {
                let delay = policy.backoff_delay(attempt, policy.jitter_ms());
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Quota exceeded, retrying attempt {} in {}ms",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rstest::rstest;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Collects the `delay_ms` field of every warning
    #[derive(Clone, Default)]
    struct RetryWarnings(Arc<Mutex<Vec<u64>>>);

    impl RetryWarnings {
        fn delays(&self) -> Vec<u64> {
            self.0.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct DelayField(Option<u64>);

    impl Visit for DelayField {
        fn record_u64(&mut self, field: &Field, value: u64) {
            if field.name() == "delay_ms" {
                self.0 = Some(value);
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for RetryWarnings {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != Level::WARN {
                return;
            }
            let mut field = DelayField::default();
            event.record(&mut field);
            if let Some(delay) = field.0 {
                self.0.lock().unwrap().push(delay);
            }
        }
    }

    /// Service replaying a fixed script of outcomes
    struct ScriptedService {
        script: Mutex<VecDeque<Result<Option<String>, ServiceError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn new(script: Vec<Result<Option<String>, ServiceError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        fn has_credential(&self) -> bool {
            true
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Option<String>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::new("script exhausted")))
        }
    }

    fn quota_error() -> ServiceError {
        ServiceError::new("RESOURCE_EXHAUSTED: Resource has been exhausted").with_status(429)
    }

    fn request() -> GenerationRequest {
        GenerationRequest::json("plan", json!({"type": "OBJECT"}))
    }

    #[rstest]
    #[case(ServiceError::new("boom").with_status(429))]
    #[case(ServiceError::new("boom").with_code(429))]
    #[case(ServiceError::new("boom").with_details(json!({"error": {"code": 429}})))]
    #[case(ServiceError::new("boom").with_details(json!({"errors": [{"status": 429}]})))]
    #[case(ServiceError::new("HTTP 429 Too Many Requests"))]
    #[case(ServiceError::new("You exceeded your current QUOTA"))]
    #[case(ServiceError::new("Resource Exhausted"))]
    #[case(ServiceError::new("boom").with_details(json!({"error": {"message": "Quota metric limit"}})))]
    fn test_quota_signals(#[case] error: ServiceError) {
        assert_eq!(classify(&error), FailureKind::QuotaExceeded);
    }

    #[rstest]
    #[case(ServiceError::new("Invalid JSON payload received").with_status(400))]
    #[case(ServiceError::new("connection reset by peer"))]
    #[case(ServiceError::new("API key not valid").with_status(403).with_code(403))]
    #[case(ServiceError::new("internal").with_status(500).with_details(json!({"error": {"code": 500, "status": "INTERNAL", "retryAfter": 429}})))]
    #[case(ServiceError::new("bad").with_details(json!({"error": {"code": "429"}})))]
    fn test_other_failures(#[case] error: ServiceError) {
        assert_eq!(classify(&error), FailureKind::Other);
    }

    #[test]
    fn test_backoff_delays_grow_and_stay_bounded() {
        let policy = RetryPolicy::default();
        let mut previous_max = Duration::ZERO;
        for attempt in 0..policy.max_retries {
            let min = policy.backoff_delay(attempt, 0);
            let max = policy.backoff_delay(attempt, policy.max_jitter_ms - 1);
            assert_eq!(min, Duration::from_millis(2_u64.pow(attempt + 1) * 1000));
            assert!(max < min + Duration::from_millis(500));
            assert!(min > previous_max);
            previous_max = max;
        }
        assert_eq!(policy.backoff_delay(4, 0), Duration::from_secs(32));
    }

    #[test]
    fn test_jitter_in_range() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            assert!(policy.jitter_ms() < 500);
        }
        let no_jitter = RetryPolicy {
            max_jitter_ms: 0,
            ..policy
        };
        assert_eq!(no_jitter.jitter_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_wait() {
        let service = ScriptedService::new(vec![Ok(Some("{}".to_string()))]);
        let start = Instant::now();

        let payload = invoke_with_retry(&service, &request(), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(payload.as_deref(), Some("{}"));
        assert_eq!(service.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_quota_failures_then_success() {
        let service = ScriptedService::new(vec![
            Err(quota_error()),
            Err(quota_error()),
            Ok(Some("{}".to_string())),
        ]);
        let start = Instant::now();

        let payload = invoke_with_retry(&service, &request(), &RetryPolicy::default())
            .await
            .unwrap();

        let waited = start.elapsed();
        assert_eq!(payload.as_deref(), Some("{}"));
        assert_eq!(service.calls(), 3);
        // 2000..2500ms then 4000..4500ms
        assert!(waited >= Duration::from_millis(6000), "waited {waited:?}");
        assert!(waited < Duration::from_millis(7000), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_exhaustion_after_five_retries() {
        let service = ScriptedService::new((0..10).map(|_| Err(quota_error())).collect());
        let start = Instant::now();

        let result = invoke_with_retry(&service, &request(), &RetryPolicy::default()).await;

        match result {
            Err(InvocationError::QuotaExceeded { retries, source }) => {
                assert_eq!(retries, 5);
                assert_eq!(source.status, Some(429));
            }
            other => panic!("expected quota exhaustion, got {other:?}"),
        }
        assert_eq!(service.calls(), 6);
        let waited = start.elapsed();
        // 2 + 4 + 8 + 16 + 32 seconds plus at most 5 * 500ms of jitter
        assert!(waited >= Duration::from_secs(62));
        assert!(waited < Duration::from_millis(64_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failure_is_not_retried() {
        let service = ScriptedService::new(vec![
            Err(ServiceError::new("Invalid JSON payload received").with_status(400)),
            Ok(Some("{}".to_string())),
        ]);
        let start = Instant::now();

        let result = invoke_with_retry(&service, &request(), &RetryPolicy::default()).await;

        match result {
            Err(InvocationError::Other(error)) => assert_eq!(error.status, Some(400)),
            other => panic!("expected a non-retryable failure, got {other:?}"),
        }
        assert_eq!(service.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_payload_is_passed_through() {
        let service = ScriptedService::new(vec![Ok(None)]);
        let payload = invoke_with_retry(&service, &request(), &RetryPolicy::default())
            .await
            .unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retry_policy() {
        let service = ScriptedService::new(vec![Err(quota_error()), Ok(Some("{}".to_string()))]);
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };

        let result = invoke_with_retry(&service, &request(), &policy).await;

        assert!(matches!(
            result,
            Err(InvocationError::QuotaExceeded { retries: 0, .. })
        ));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_warnings_are_logged_per_retry() {
        let warnings = RetryWarnings::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(warnings.clone()),
        );

        let service = ScriptedService::new(vec![Ok(Some("{}".to_string()))]);
        invoke_with_retry(&service, &request(), &RetryPolicy::default())
            .await
            .unwrap();
        assert!(warnings.delays().is_empty());

        let service = ScriptedService::new(vec![
            Err(quota_error()),
            Err(quota_error()),
            Ok(Some("{}".to_string())),
        ]);
        invoke_with_retry(&service, &request(), &RetryPolicy::default())
            .await
            .unwrap();

        let delays = warnings.delays();
        assert_eq!(delays.len(), 2, "{delays:?}");
        assert!((2000..2500).contains(&delays[0]), "{delays:?}");
        assert!((4000..4500).contains(&delays[1]), "{delays:?}");
    }
}
