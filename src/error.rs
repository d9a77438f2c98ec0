//! Error types for cescout.
//!
//! Two families of errors exist and they are handled very differently:
//!
//! - [`ValidationError`]: the caller asked for something malformed (a bad date,
//!   an inverted range, an unknown country code). These are surfaced
//!   immediately and reject the whole request.
//! - [`FetchError`]: one upstream source could not be reached or returned
//!   something unusable. These stay local to the source that produced them and
//!   end up as a [`SourceOutcome::Failure`](crate::model::SourceOutcome) in the
//!   report, so the other sources are unaffected.

use serde::Serialize;
use thiserror::Error;

/// A rejected caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid date: {0} (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")]
    InvalidDate(String),

    #[error("invalid date range: since {since} is after until {until}")]
    InvertedRange { since: String, until: String },

    #[error("invalid country code: {0} (expected two-letter ISO 3166-1 code)")]
    InvalidCountry(String),

    #[error("invalid ASN: {0}")]
    InvalidAsn(String),

    #[error("unknown source: {0} (expected ioda, ooni or ripe)")]
    UnknownSource(String),
}

/// Coarse classification of a source failure, exposed in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// HTTP connectivity problem or non-success status.
    Transport,
    /// The measurement database could not be queried.
    Database,
    /// Required settings for the source are missing.
    Configuration,
    /// The upstream answered but the payload did not have the expected shape.
    MalformedResponse,
}

/// A failure while fetching from one upstream source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("source not configured: {0}")]
    NotConfigured(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Http(e) if e.is_decode() => FailureKind::MalformedResponse,
            FetchError::Http(_) => FailureKind::Transport,
            FetchError::Database(_) => FailureKind::Database,
            FetchError::NotConfigured(_) => FailureKind::Configuration,
            FetchError::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }
}
