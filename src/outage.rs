//! Outage detection over IODA alert series.
//!
//! IODA does not expose an "outage" flag directly. A country is treated as
//! affected by an outage when its time-ordered alert levels contain at least
//! one transition from `normal` to `warning` or `critical` inside the queried
//! window. Recoveries (`critical` back to `normal`) do not count; only the
//! onset does. Alerts with any other level stay in the series: they break
//! adjacency but never form an onset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Alert level reported by IODA for a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
    /// A level IODA reported that is none of the above.
    #[serde(other)]
    Unrecognized,
}

impl AlertLevel {
    /// Parse an upstream level, keeping unknown values as `Unrecognized`.
    pub fn from_upstream(raw: &str) -> Self {
        raw.parse().unwrap_or(AlertLevel::Unrecognized)
    }
}

impl FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(AlertLevel::Normal),
            "warning" => Ok(AlertLevel::Warning),
            "critical" => Ok(AlertLevel::Critical),
            other => Err(format!("unrecognized alert level: {other}")),
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
            AlertLevel::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}

/// One alert for a country, reduced to what the classifier needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertEvent {
    /// Unix timestamp of the alert.
    pub time: i64,
    pub level: AlertLevel,
    /// IODA's identifier for the measurement stream that raised the alert.
    pub fqid: String,
}

/// Result of classifying a series with at least two events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutageAssessment {
    pub is_outage: bool,
    /// fqid of the warning/critical alert that completes each onset, in time
    /// order.
    pub evidence: Vec<String>,
}

/// Pair adjacent items: `[a, b, c]` becomes `[(a, b), (b, c)]`.
///
/// Returns `None` when there are fewer than two items, since no transition
/// can be observed.
pub fn pair<T: Clone>(items: &[T]) -> Option<Vec<(T, T)>> {
    if items.len() < 2 {
        return None;
    }
    Some(
        items
            .windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect(),
    )
}

/// Whether a transition marks the onset of an outage.
pub fn is_onset(transition: (AlertLevel, AlertLevel)) -> bool {
    matches!(
        transition,
        (AlertLevel::Normal, AlertLevel::Warning) | (AlertLevel::Normal, AlertLevel::Critical)
    )
}

/// Classify a country's alert series.
///
/// The events are stably sorted by time before pairing, so alerts with equal
/// timestamps keep their upstream order. Returns `None` for fewer than two
/// events: that is "no data", not "no outage".
pub fn classify(events: &[AlertEvent]) -> Option<OutageAssessment> {
    let mut ordered: Vec<&AlertEvent> = events.iter().collect();
    ordered.sort_by_key(|event| event.time);

    let pairs = pair(&ordered)?;

    let evidence: Vec<String> = pairs
        .iter()
        .filter(|(before, after)| is_onset((before.level, after.level)))
        .map(|(_, after)| after.fqid.clone())
        .collect();

    for fqid in &evidence {
        debug!(fqid = %fqid, "Outage transition");
    }

    Some(OutageAssessment {
        is_outage: !evidence.is_empty(),
        evidence,
    })
}
