//! Enum types for outreach entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an email instance as tracked by the campaign service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    /// Generated but not yet reviewed or sent
    #[default]
    Draft,
    /// Held for a human to look at before sending
    AwaitingReview,
    /// Accepted by the sender, not yet handed to transport
    Queued,
    Sent,
    Delivered,
    Failed,
    /// Recipient answered
    Replied,
}

impl EmailStatus {
    /// Wire representation used in query strings and JSON bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Draft => "draft",
            EmailStatus::AwaitingReview => "awaiting_review",
            EmailStatus::Queued => "queued",
            EmailStatus::Sent => "sent",
            EmailStatus::Delivered => "delivered",
            EmailStatus::Failed => "failed",
            EmailStatus::Replied => "replied",
        }
    }

    /// Parse from the wire representation.
    pub fn from_wire_str(s: &str) -> Result<Self, EmailStatusParseError> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(EmailStatus::Draft),
            "awaiting_review" => Ok(EmailStatus::AwaitingReview),
            "queued" => Ok(EmailStatus::Queued),
            "sent" => Ok(EmailStatus::Sent),
            "delivered" => Ok(EmailStatus::Delivered),
            "failed" => Ok(EmailStatus::Failed),
            "replied" => Ok(EmailStatus::Replied),
            _ => Err(EmailStatusParseError(s.to_string())),
        }
    }

    /// Whether a send for this email's step will pick it up.
    pub fn is_sendable(&self) -> bool {
        matches!(self, EmailStatus::Draft | EmailStatus::AwaitingReview)
    }

    pub fn all() -> &'static [EmailStatus] {
        &[
            EmailStatus::Draft,
            EmailStatus::AwaitingReview,
            EmailStatus::Queued,
            EmailStatus::Sent,
            EmailStatus::Delivered,
            EmailStatus::Failed,
            EmailStatus::Replied,
        ]
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmailStatus {
    type Err = EmailStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire_str(s)
    }
}

/// Error when parsing an invalid email status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailStatusParseError(pub String);

impl fmt::Display for EmailStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid email status: {}", self.0)
    }
}

impl std::error::Error for EmailStatusParseError {}

/// How the service should dispatch a sequence step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    #[default]
    Immediate,
    /// Accepted by the service schema but not acted on yet
    Schedule,
}
