//! Booking requests
//!
//! A user who likes a generated trip can ask the booking desk to reserve it.
//! Requests are delivered as email through the configured SMTP relay.

use anyhow::Context;
use lettre::message::Mailbox;
use lettre::transport::smtp::SmtpTransport;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::BookingConfig;
use crate::{GolfTripError, Result};

/// Booking request submitted from the booking form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_dates: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Title of the generated trip the request refers to
    #[serde(default)]
    pub trip_title: Option<String>,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GolfTripError::validation("Name cannot be empty"));
        }

        let email = self.email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(GolfTripError::validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }

        Ok(())
    }

    fn subject(&self) -> String {
        match &self.trip_title {
            Some(title) if !title.trim().is_empty() => format!("Booking request: {}", title.trim()),
            _ => "Booking request: custom golf trip".to_string(),
        }
    }

    fn body(&self) -> String {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or("-")
                .to_string()
        };

        format!(
            "New golf trip booking request\n\n\
Name: {}\n\
Email: {}\n\
Phone: {}\n\
Trip: {}\n\
Preferred dates: {}\n\n\
Notes:\n{}\n",
            self.name.trim(),
            self.email.trim(),
            optional(&self.phone),
            optional(&self.trip_title),
            optional(&self.preferred_dates),
            optional(&self.notes),
        )
    }
}

/// Sends booking requests to the booking desk
#[derive(Debug, Clone)]
pub struct BookingMailer {
    config: BookingConfig,
}

impl BookingMailer {
    /// Create a mailer; fails when the SMTP relay or addresses are missing
    pub fn new(config: BookingConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(GolfTripError::config(
                "Booking email is not configured (smtp_relay, sender and recipient are required)",
            ));
        }
        Ok(Self { config })
    }

    /// Build the email for a booking request
    pub fn compose(&self, request: &BookingRequest) -> Result<Message> {
        request.validate()?;

        let from: Mailbox = format!("GolfTrip <{}>", self.setting(&self.config.sender))
            .parse()
            .map_err(|err| GolfTripError::config(format!("Invalid sender address: {err}")))?;
        let to: Mailbox = self
            .setting(&self.config.recipient)
            .parse()
            .map_err(|err| GolfTripError::config(format!("Invalid recipient address: {err}")))?;
        let reply_to: Mailbox = format!("{} <{}>", request.name.trim(), request.email.trim())
            .parse()
            .map_err(|err| GolfTripError::validation(format!("Invalid email address: {err}")))?;

        Message::builder()
            .from(from)
            .reply_to(reply_to)
            .to(to)
            .subject(request.subject())
            .body(request.body())
            .map_err(|err| GolfTripError::booking(format!("Failed to build email: {err}")))
    }

    /// Compose and deliver a booking request
    #[instrument(skip_all, fields(trip = request.trip_title.as_deref().unwrap_or("custom")))]
    pub async fn send(&self, request: &BookingRequest) -> Result<()> {
        let email = self.compose(request)?;
        let mailer = self.transport()?;

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .context("Booking mail task failed")
            .map_err(|err| GolfTripError::booking(format!("{err:#}")))?
            .map_err(|err| GolfTripError::booking(format!("Failed to send email: {err}")))?;

        info!("Sent booking request from {}", request.email.trim());
        Ok(())
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let relay = self.setting(&self.config.smtp_relay);
        let mut builder = SmtpTransport::relay(relay)
            .map_err(|err| GolfTripError::config(format!("Invalid SMTP relay '{relay}': {err}")))?;

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn setting<'a>(&self, value: &'a Option<String>) -> &'a str {
        value.as_deref().map(str::trim).unwrap_or_default()
    }
}
