//! Generation service seam
//!
//! The itinerary is produced by an external content-generation service. This
//! module defines the request descriptor, the opaque error value the service
//! reports and the trait the rest of the crate talks to.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod gemini;

pub use gemini::GeminiClient;

/// Opaque request descriptor: free-text instructions plus the declared output shape
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Schema the generated document is expected to follow
    pub response_schema: Value,
    pub response_mime_type: String,
}

impl GenerationRequest {
    /// Create a request expecting a JSON document of the given shape
    pub fn json(prompt: impl Into<String>, response_schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema,
            response_mime_type: "application/json".to_string(),
        }
    }
}

/// Failure reported by the generation service
///
/// Carries every signal the service may expose: the transport status, a
/// numeric error code, the message and the structured error body. Nothing is
/// interpreted here; see [`crate::retry::classify`].
#[derive(Debug, Clone, Default, PartialEq, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// HTTP status of the failed call, if one was received
    pub status: Option<u16>,
    /// Numeric error code from the error body
    pub code: Option<i64>,
    pub message: String,
    /// Structured error body as returned by the service
    pub details: Option<Value>,
}

impl ServiceError {
    /// Error with only a message (transport failures, decoding failures)
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// External content-generation service
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Whether the credential needed to call the service is configured
    fn has_credential(&self) -> bool;

    /// Run one generation call.
    ///
    /// `Ok(None)` means the call succeeded but carried no text.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, ServiceError>;
}
