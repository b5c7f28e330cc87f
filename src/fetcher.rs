//! Itinerary fetcher
//!
//! Owns the request lifecycle for one session: checks the credential, builds
//! the request from the preferences, runs it through the retry policy,
//! parses the payload and publishes the result into the single result slot.
//!
//! ```text
//! Idle -> Requesting -> Ready(result)
//!                    \-> Failed(notice)
//! ```
//!
//! A request whose future is dropped before it finishes puts the slot back
//! to what it held before the request started.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::generation::GenerationService;
use crate::models::{TripPreferences, TripResult};
use crate::prompt;
use crate::retry::{InvocationError, RetryPolicy, invoke_with_retry};
use crate::{GolfTripError, Result};

/// Booking contact stamped onto every published trip
pub const CONTACT_LINK: &str = "https://golftrip.example.com/contact";

/// What the user is told about the last failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNotice {
    pub kind: &'static str,
    pub message: String,
}

impl From<&GolfTripError> for FailureNotice {
    fn from(error: &GolfTripError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
        }
    }
}

/// Lifecycle of the session's itinerary request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "camelCase")]
pub enum RequestState {
    Idle,
    Requesting,
    Ready(TripResult),
    Failed(FailureNotice),
}

/// Parse a raw payload into a trip and stamp the contact link
pub fn parse_trip_result(payload: Option<&str>, contact_link: &str) -> Result<TripResult> {
    let text = payload
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| GolfTripError::malformed("The itinerary service returned no content"))?;

    let mut trip: TripResult = serde_json::from_str(text).map_err(|err| {
        GolfTripError::malformed(format!("Itinerary does not match the expected shape: {err}"))
    })?;

    trip.contact_link = contact_link.to_string();
    Ok(trip)
}

impl From<InvocationError> for GolfTripError {
    fn from(error: InvocationError) -> Self {
        match error {
            InvocationError::QuotaExceeded { retries, source } => GolfTripError::QuotaExceeded {
                retries,
                message: source.message,
            },
            InvocationError::Other(source) => GolfTripError::service(source.message),
        }
    }
}

fn lock_slot(slot: &Mutex<RequestState>) -> MutexGuard<'_, RequestState> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the slot as `Requesting` while alive.
///
/// Dropping it without calling [`InFlight::finish`] restores the previous
/// state so a cancelled request never leaves the slot stuck.
struct InFlight<'a> {
    slot: &'a Mutex<RequestState>,
    previous: Option<RequestState>,
}

impl<'a> InFlight<'a> {
    fn begin(slot: &'a Mutex<RequestState>) -> Result<Self> {
        let mut state = lock_slot(slot);
        if matches!(*state, RequestState::Requesting) {
            return Err(GolfTripError::RequestInFlight);
        }
        let previous = std::mem::replace(&mut *state, RequestState::Requesting);
        Ok(Self {
            slot,
            previous: Some(previous),
        })
    }

    fn finish(mut self, next: RequestState) {
        self.previous = None;
        *lock_slot(self.slot) = next;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            warn!("Itinerary request cancelled before completion");
            *lock_slot(self.slot) = previous;
        }
    }
}

/// Fetches itineraries for one session and keeps the current result
pub struct ItineraryFetcher<S: ?Sized> {
    policy: RetryPolicy,
    contact_link: String,
    state: Mutex<RequestState>,
    service: Arc<S>,
}

impl<S> ItineraryFetcher<S>
where
    S: GenerationService + ?Sized,
{
    /// Create a fetcher with the default retry policy and contact link
    pub fn new(service: Arc<S>) -> Self {
        Self {
            policy: RetryPolicy::default(),
            contact_link: CONTACT_LINK.to_string(),
            state: Mutex::new(RequestState::Idle),
            service,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Snapshot of the current lifecycle state
    pub fn state(&self) -> RequestState {
        self.lock_state().clone()
    }

    /// The currently published trip, if the last request succeeded
    pub fn current_result(&self) -> Option<TripResult> {
        match &*self.lock_state() {
            RequestState::Ready(trip) => Some(trip.clone()),
            _ => None,
        }
    }

    /// Generate an itinerary for `preferences` and publish it.
    ///
    /// Fails with `RequestInFlight` without touching the slot when another
    /// request is outstanding.
    #[instrument(skip_all, fields(days = preferences.days, golfers = preferences.golfers, region = %preferences.region))]
    pub async fn fetch(&self, preferences: &TripPreferences) -> Result<TripResult> {
        let in_flight = InFlight::begin(&self.state)?;

        let outcome = self.run(preferences).await;

        match &outcome {
            Ok(trip) => {
                info!("Published itinerary '{}' with {} days", trip.title, trip.itinerary.len());
                in_flight.finish(RequestState::Ready(trip.clone()));
            }
            Err(err) => {
                error!("Itinerary request failed: {}", err);
                in_flight.finish(RequestState::Failed(FailureNotice::from(err)));
            }
        }
        outcome
    }

    /// Whether a request is currently outstanding
    pub fn is_requesting(&self) -> bool {
        matches!(*self.lock_state(), RequestState::Requesting)
    }

    async fn run(&self, preferences: &TripPreferences) -> Result<TripResult> {
        if !self.service.has_credential() {
            return Err(GolfTripError::missing_credential(
                "No API key configured for the itinerary service",
            ));
        }

        preferences.validate()?;

        let request = prompt::build_request(preferences);
        let payload = invoke_with_retry(self.service.as_ref(), &request, &self.policy).await?;

        parse_trip_result(payload.as_deref(), &self.contact_link)
    }

    fn lock_state(&self) -> MutexGuard<'_, RequestState> {
        lock_slot(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationRequest, ServiceError};
    use crate::models::itinerary::fixtures::SAMPLE_TRIP_JSON;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct ScriptedService {
        credential: bool,
        script: Mutex<VecDeque<std::result::Result<Option<String>, ServiceError>>>,
        calls: Arc<AtomicUsize>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedService {
        fn new(script: Vec<std::result::Result<Option<String>, ServiceError>>) -> Self {
            Self {
                credential: true,
                script: Mutex::new(script.into()),
                calls: Arc::new(AtomicUsize::new(0)),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> std::result::Result<Option<String>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::new("script exhausted")))
        }
    }

    fn sample() -> Option<String> {
        Some(SAMPLE_TRIP_JSON.to_string())
    }

    #[test]
    fn test_parse_overwrites_contact_link() {
        let trip = parse_trip_result(Some(SAMPLE_TRIP_JSON), CONTACT_LINK).unwrap();
        assert_eq!(trip.contact_link, CONTACT_LINK);

        let without: serde_json::Value = {
            let mut value: serde_json::Value = serde_json::from_str(SAMPLE_TRIP_JSON).unwrap();
            value.as_object_mut().unwrap().remove("contactLink");
            value
        };
        let trip = parse_trip_result(Some(&without.to_string()), CONTACT_LINK).unwrap();
        assert_eq!(trip.contact_link, CONTACT_LINK);
    }

    #[test]
    fn test_parse_rejects_empty_and_invalid_payloads() {
        for payload in [None, Some(""), Some("   \n"), Some("not json"), Some("{\"title\": \"x\"}")] {
            let err = parse_trip_result(payload, CONTACT_LINK).unwrap_err();
            assert!(
                matches!(err, GolfTripError::MalformedResponse { .. }),
                "{payload:?} gave {err:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_fetch_publishes_result() {
        let fetcher = ItineraryFetcher::new(Arc::new(ScriptedService::new(vec![Ok(sample())])));
        assert_eq!(fetcher.state(), RequestState::Idle);

        let trip = fetcher.fetch(&TripPreferences::default()).await.unwrap();

        assert_eq!(trip.contact_link, CONTACT_LINK);
        assert_eq!(fetcher.current_result(), Some(trip.clone()));
        assert_eq!(fetcher.state(), RequestState::Ready(trip));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_credential_skips_call() {
        let mut service = ScriptedService::new(vec![Ok(sample())]);
        service.credential = false;
        let calls = service.calls.clone();
        let fetcher = ItineraryFetcher::new(Arc::new(service));

        let err = fetcher.fetch(&TripPreferences::default()).await.unwrap_err();

        assert!(matches!(err, GolfTripError::MissingCredential { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        match fetcher.state() {
            RequestState::Failed(notice) => assert_eq!(notice.kind, "missing_credential"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_preferences_rejected_before_call() {
        let service = ScriptedService::new(vec![Ok(sample())]);
        let calls = service.calls.clone();
        let fetcher = ItineraryFetcher::new(Arc::new(service));
        let preferences = TripPreferences {
            days: 9,
            ..TripPreferences::default()
        };

        let err = fetcher.fetch(&preferences).await.unwrap_err();

        assert!(matches!(err, GolfTripError::Validation { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_payload_publishes_nothing() {
        let fetcher = ItineraryFetcher::new(Arc::new(ScriptedService::new(vec![
            Ok(sample()),
            Ok(Some(String::new())),
        ])));

        fetcher.fetch(&TripPreferences::default()).await.unwrap();
        let err = fetcher.fetch(&TripPreferences::default()).await.unwrap_err();

        assert!(matches!(err, GolfTripError::MalformedResponse { .. }));
        assert!(fetcher.current_result().is_none());
        match fetcher.state() {
            RequestState::Failed(notice) => {
                assert_eq!(notice.kind, "malformed_response");
                assert!(notice.message.contains("Failed to generate"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_exhaustion_maps_to_quota_error() {
        let script = (0..6)
            .map(|_| Err(ServiceError::new("quota exceeded").with_status(429)))
            .collect();
        let fetcher = ItineraryFetcher::new(Arc::new(ScriptedService::new(script)));

        let err = fetcher.fetch(&TripPreferences::default()).await.unwrap_err();

        assert!(matches!(err, GolfTripError::QuotaExceeded { retries: 5, .. }));
        assert!(err.user_message().contains("high traffic"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_quota_failure_maps_to_service_error() {
        let fetcher = ItineraryFetcher::new(Arc::new(ScriptedService::new(vec![Err(
            ServiceError::new("Invalid JSON payload received").with_status(400),
        )])));

        let err = fetcher.fetch(&TripPreferences::default()).await.unwrap_err();

        assert!(matches!(err, GolfTripError::Service { .. }));
        assert!(err.user_message().contains("Failed to generate"));
    }

    #[tokio::test]
    async fn test_second_request_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut service = ScriptedService::new(vec![Ok(sample())]);
        service.gate = Some(gate.clone());
        let calls = service.calls.clone();
        let fetcher = Arc::new(ItineraryFetcher::new(Arc::new(service)));

        let first = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&TripPreferences::default()).await }
        });

        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fetcher.state(), RequestState::Requesting);

        let err = fetcher.fetch(&TripPreferences::default()).await.unwrap_err();
        assert!(matches!(err, GolfTripError::RequestInFlight));

        gate.notify_one();
        let trip = first.await.unwrap().unwrap();
        assert_eq!(fetcher.current_result(), Some(trip));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_releases_the_slot() {
        let service = ScriptedService::new(vec![
            Err(ServiceError::new("Resource has been exhausted").with_status(429)),
            Ok(sample()),
        ]);
        let calls = service.calls.clone();
        let fetcher = Arc::new(ItineraryFetcher::new(Arc::new(service)));

        let first = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&TripPreferences::default()).await }
        });

        // first attempt failed with a quota error, the task is now backing off
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(fetcher.is_requesting());

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(fetcher.state(), RequestState::Idle);

        tokio::time::advance(std::time::Duration::from_secs(120)).await;

        let trip = fetcher.fetch(&TripPreferences::default()).await.unwrap();
        assert_eq!(fetcher.state(), RequestState::Ready(trip));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_keeps_previous_result() {
        let gate = Arc::new(Notify::new());
        let mut service = ScriptedService::new(vec![Ok(sample()), Ok(sample())]);
        service.gate = Some(gate.clone());
        let calls = service.calls.clone();
        let fetcher = Arc::new(ItineraryFetcher::new(Arc::new(service)));

        gate.notify_one();
        let trip = fetcher.fetch(&TripPreferences::default()).await.unwrap();

        let second = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&TripPreferences::default()).await }
        });
        while calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        second.abort();
        assert!(second.await.unwrap_err().is_cancelled());
        assert_eq!(fetcher.current_result(), Some(trip));
    }
}
