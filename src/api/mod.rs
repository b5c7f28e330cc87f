use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::error;

use crate::{
    GolfTripError,
    booking::{BookingMailer, BookingRequest},
    fetcher::{CONTACT_LINK, RequestState},
    generation::GenerationService,
    models::{FormOptions, TripPreferences},
    session::{SESSION_HEADER, SessionStore},
};

/// Shared state of the planning API
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    /// `None` when booking email is not configured
    pub booking: Option<Arc<BookingMailer>>,
}

impl AppState {
    pub fn new(service: Arc<dyn GenerationService>, booking: Option<BookingMailer>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(service)),
            booking: booking.map(Arc::new),
        }
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|value| value.to_str().ok())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_link: Option<&'static str>,
}

impl IntoResponse for GolfTripError {
    fn into_response(self) -> Response {
        let status = match &self {
            GolfTripError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GolfTripError::MissingCredential { .. } | GolfTripError::Config { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GolfTripError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GolfTripError::RequestInFlight => StatusCode::CONFLICT,
            GolfTripError::MalformedResponse { .. }
            | GolfTripError::Service { .. }
            | GolfTripError::Booking { .. } => StatusCode::BAD_GATEWAY,
            GolfTripError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.kind(),
            message: self.user_message(),
            contact_link: matches!(self, GolfTripError::Booking { .. } | GolfTripError::Config { .. })
                .then_some(CONTACT_LINK),
        };

        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/options", get(get_options))
        .route("/preferences/default", get(get_default_preferences))
        .route("/itinerary", get(get_itinerary).post(create_itinerary))
        .route("/booking", post(create_booking))
        .with_state(state)
}

async fn get_options() -> Json<FormOptions> {
    Json(FormOptions::new())
}

async fn get_default_preferences() -> Json<TripPreferences> {
    Json(TripPreferences::default())
}

async fn get_itinerary(State(state): State<AppState>, headers: HeaderMap) -> Json<RequestState> {
    Json(state.sessions.state(session_id(&headers)))
}

/// Generate for the caller's session; the session id is echoed back in the
/// response header, including a newly assigned one
async fn create_itinerary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(preferences): Json<TripPreferences>,
) -> Response {
    let (id, fetcher) = state.sessions.get_or_create(session_id(&headers));

    let mut response = match fetcher.fetch(&preferences).await {
        Ok(trip) => Json(trip).into_response(),
        Err(err) => err.into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Result<StatusCode, GolfTripError> {
    send_booking(&state, &request)
        .await
        .inspect_err(|err| error!("Booking request failed: {}", err))?;
    Ok(StatusCode::ACCEPTED)
}

async fn send_booking(state: &AppState, request: &BookingRequest) -> Result<(), GolfTripError> {
    let mailer = state
        .booking
        .as_ref()
        .ok_or_else(|| GolfTripError::config("Booking email is not configured"))?;

    request.validate()?;
    mailer.send(request).await
}
