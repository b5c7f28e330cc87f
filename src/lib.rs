//! `GolfTrip` - Golf trip itinerary planning
//!
//! This library collects trip preferences, asks an external generation
//! service for an itinerary, retries quota failures with backoff and
//! publishes the parsed trip for the web API and the CLI.

pub mod api;
pub mod booking;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod generation;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod retry;
pub mod session;
pub mod web;

// Re-export core types for public API
pub use booking::{BookingMailer, BookingRequest};
pub use config::GolfTripConfig;
pub use error::GolfTripError;
pub use fetcher::{CONTACT_LINK, ItineraryFetcher, RequestState};
pub use generation::{GeminiClient, GenerationRequest, GenerationService, ServiceError};
pub use models::{TripPreferences, TripResult};
pub use retry::{FailureKind, RetryPolicy, classify, invoke_with_retry};
pub use session::{SESSION_HEADER, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, GolfTripError>;
