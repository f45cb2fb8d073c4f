//! # Snippet Message
//!
//! The request envelope published to the snippet worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retention::RetentionPeriod;

/// The unit of work sent to the broker.
///
/// Field names and the RFC 3339 `lifetime` timestamp format are the wire
/// contract with the worker side; changing either breaks interoperability.
///
/// A message is immutable once constructed and is owned solely by the call
/// that created it until handed to the broker session for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetMessage {
    /// Raw payload text.
    pub text: String,

    /// Absolute expiry, fixed at assembly time and never recomputed.
    pub lifetime: DateTime<Utc>,

    /// Short tag describing the payload's format.
    pub extension: String,
}

impl SnippetMessage {
    /// Assemble a snippet expiring at `now + retention`.
    ///
    /// A zero retention yields an expiry equal to the assembly time,
    /// never a past timestamp.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        extension: impl Into<String>,
        retention: RetentionPeriod,
    ) -> Self {
        Self::assembled_at(text, extension, retention, Utc::now())
    }

    /// Assemble a snippet against an explicit assembly timestamp.
    #[must_use]
    pub fn assembled_at(
        text: impl Into<String>,
        extension: impl Into<String>,
        retention: RetentionPeriod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            text: text.into(),
            lifetime: now + retention.as_duration(),
            extension: extension.into(),
        }
    }
}
