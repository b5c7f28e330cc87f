//! Error types and handling for the `GolfTrip` application

use thiserror::Error;

/// Main error type for the `GolfTrip` application
#[derive(Error, Debug)]
pub enum GolfTripError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The generation service credential is not configured
    #[error("Missing credential: {message}")]
    MissingCredential { message: String },

    /// The generation service kept reporting quota exhaustion
    #[error("Quota exceeded after {retries} retries: {message}")]
    QuotaExceeded { retries: u32, message: String },

    /// The generation service answered with a payload that is not a trip
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Any other generation service failure (network, rejected request, ...)
    #[error("Service error: {message}")]
    Service { message: String },

    /// A request is already outstanding for this session
    #[error("An itinerary request is already in progress")]
    RequestInFlight,

    /// Booking request delivery errors
    #[error("Booking error: {message}")]
    Booking { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GolfTripError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new missing credential error
    pub fn missing_credential<S: Into<String>>(message: S) -> Self {
        Self::MissingCredential {
            message: message.into(),
        }
    }

    /// Create a new malformed response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new service error
    pub fn service<S: Into<String>>(message: S) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Create a new booking error
    pub fn booking<S: Into<String>>(message: S) -> Self {
        Self::Booking {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GolfTripError::Config { .. } => "config",
            GolfTripError::Validation { .. } => "validation",
            GolfTripError::MissingCredential { .. } => "missing_credential",
            GolfTripError::QuotaExceeded { .. } => "quota_exceeded",
            GolfTripError::MalformedResponse { .. } => "malformed_response",
            GolfTripError::Service { .. } => "service",
            GolfTripError::RequestInFlight => "request_in_flight",
            GolfTripError::Booking { .. } => "booking",
            GolfTripError::Io { .. } => "io",
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            GolfTripError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            GolfTripError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            GolfTripError::MissingCredential { .. } => {
                "The itinerary service API key is missing. Set GEMINI_API_KEY and try again."
                    .to_string()
            }
            GolfTripError::QuotaExceeded { .. } => {
                "We're experiencing high traffic and have exceeded our quota. Please try again in a moment."
                    .to_string()
            }
            GolfTripError::MalformedResponse { .. } | GolfTripError::Service { .. } => {
                "Failed to generate your trip itinerary. Please try again.".to_string()
            }
            GolfTripError::RequestInFlight => {
                "Your itinerary is still being generated. Please wait for it to finish.".to_string()
            }
            GolfTripError::Booking { .. } => {
                "We couldn't send your booking request. Please use the contact link instead."
                    .to_string()
            }
            GolfTripError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
