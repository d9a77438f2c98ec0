//! Report-level data types shared by the aggregator and the HTTP API.
//!
//! The per-source payloads live next to the code that builds them
//! ([`OutageVerdict`], [`MeasurementSummary`], [`AsnRoutingRecord`]); this
//! module only defines how they are wrapped and combined.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::country::validate_country;
use crate::dates::TimeWindow;
use crate::error::{FailureKind, FetchError, ValidationError};
use crate::data_sources::OutageVerdict;
use crate::measurements::MeasurementSummary;
use crate::routing::AsnRoutingRecord;

/// One of the three upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    /// IODA outage alerts.
    Ioda,
    /// OONI web-connectivity measurements.
    Ooni,
    /// RIPEstat routing status.
    Ripe,
}

impl SourceName {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SourceName::Ioda => "IODA",
            SourceName::Ooni => "OONI",
            SourceName::Ripe => "RIPEstat",
        }
    }
}

impl FromStr for SourceName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ioda" => Ok(SourceName::Ioda),
            "ooni" => Ok(SourceName::Ooni),
            "ripe" | "ripestat" => Ok(SourceName::Ripe),
            _ => Err(ValidationError::UnknownSource(s.to_string())),
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What one source contributed to a report.
///
/// "Fetched but empty" is a `Success` with an empty payload; it is never
/// conflated with `Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome<T> {
    Success { data: T },
    Failure { kind: FailureKind, message: String },
    /// The source was not run for this request.
    Skipped { reason: String },
}

impl<T> SourceOutcome<T> {
    pub fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(data) => SourceOutcome::Success { data },
            Err(e) => SourceOutcome::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceOutcome::Failure { .. })
    }

    /// The payload, if the source succeeded.
    pub fn data(&self) -> Option<&T> {
        match self {
            SourceOutcome::Success { data } => Some(data),
            _ => None,
        }
    }

    /// Replace a failure with an empty success produced by `empty`.
    pub fn degrade_with<F: FnOnce() -> T>(self, empty: F) -> Self {
        match self {
            SourceOutcome::Failure { .. } => SourceOutcome::Success { data: empty() },
            other => other,
        }
    }
}

/// Per-ASN routing comparison, keyed by ASN.
pub type RoutingDeltas = BTreeMap<u32, AsnRoutingRecord>;

/// A validated report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Upper-case ISO 3166-1 alpha-2 code.
    pub country: String,
    /// ASNs to check routing for; `None` skips RIPEstat.
    pub asns: Option<Vec<u32>>,
    pub window: TimeWindow,
}

impl ReportRequest {
    /// Validate raw inputs into a request.
    pub fn new(
        country: &str,
        asns: Option<Vec<u32>>,
        window: TimeWindow,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            country: validate_country(country)?,
            asns,
            window,
        })
    }
}

/// Query parameters for the report endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    /// Two-letter country code.
    #[serde(default)]
    pub country: String,

    /// Start of the window (`YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`, UTC).
    pub since: Option<String>,

    /// End of the window; defaults to now.
    pub until: Option<String>,

    /// Comma-separated ASNs, e.g. `4134,45102`.
    pub asns: Option<String>,
}

impl ReportQuery {
    /// Validate the query into a [`ReportRequest`], using `now` for defaults.
    pub fn into_request(self, now: NaiveDateTime) -> Result<ReportRequest, ValidationError> {
        let window = TimeWindow::parse(self.since.as_deref(), self.until.as_deref(), now)?;
        let asns = self.asns.as_deref().map(parse_asns).transpose()?;
        ReportRequest::new(&self.country, asns, window)
    }
}

/// Parse a comma-separated ASN list. Accepts an optional `AS` prefix.
pub fn parse_asns(raw: &str) -> Result<Vec<u32>, ValidationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let digits = s
                .strip_prefix("AS")
                .or_else(|| s.strip_prefix("as"))
                .unwrap_or(s);
            digits
                .parse::<u32>()
                .map_err(|_| ValidationError::InvalidAsn(s.to_string()))
        })
        .collect()
}

/// The assembled report for one country and window.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub country: String,
    /// English name of `country`, or `"Unknown"`.
    pub country_name: String,
    pub since: NaiveDateTime,
    pub until: NaiveDateTime,
    /// RFC 3339 with whole seconds.
    pub generated_at: String,
    pub ioda: SourceOutcome<OutageVerdict>,
    pub ooni: SourceOutcome<MeasurementSummary>,
    pub ripe: SourceOutcome<RoutingDeltas>,
}

impl Report {
    /// Number of sources that produced data.
    pub fn successful_sources(&self) -> usize {
        [
            self.ioda.is_success(),
            self.ooni.is_success(),
            self.ripe.is_success(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }
}
