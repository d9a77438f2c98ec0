//! OONI web-connectivity measurements from a local `metadb` replica.
//!
//! OONI's public API is not used: queries run against a synced copy of the
//! metadb (see [`crate::storage`]). Measurements are queried for whole days,
//! since OONI reports are dated by test start and a partial day would cut
//! reports in half.

use tracing::{info, instrument};

use crate::dates::TimeWindow;
use crate::error::FetchError;
use crate::measurements::{MeasurementSummary, summarize};
use crate::storage::{MeasurementQuery, MeasurementStore};
use crate::template::LinkTemplate;

/// Default OONI Explorer link for a measurement.
pub const EXPLORER_LINK: &str = "https://explorer.ooni.io/measurement/{report_id}?input={input}";

/// Domains checked when none are configured: the Wikimedia projects.
pub const DEFAULT_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "wikimedia.org",
    "wikidata.org",
    "wikisource.org",
    "wikibooks.org",
    "wiktionary.org",
    "wikiquote.org",
    "wikiversity.org",
    "wikivoyage.org",
    "wikinews.org",
];

/// OONI measurement source over any [`MeasurementStore`].
#[derive(Clone)]
pub struct OoniSource<S> {
    store: S,
    domains: Vec<String>,
    explorer_link: LinkTemplate,
}

impl<S: MeasurementStore + Sync> OoniSource<S> {
    /// Create a source. Fails when no domains are given, since the query would
    /// match nothing.
    pub fn new(store: S, domains: Vec<String>, explorer_link: &str) -> Result<Self, FetchError> {
        if domains.is_empty() {
            return Err(FetchError::NotConfigured(
                "no OONI domains configured".to_string(),
            ));
        }
        Ok(Self {
            store,
            domains,
            explorer_link: LinkTemplate::new(explorer_link),
        })
    }

    /// Summarize measurements for `country` over the days covered by `window`.
    #[instrument(skip(self))]
    pub async fn measurements(
        &self,
        country: &str,
        window: &TimeWindow,
    ) -> Result<MeasurementSummary, FetchError> {
        let (since, until) = window.day_bounds();
        let query = MeasurementQuery {
            country: country.to_string(),
            domains: self.domains.clone(),
            since,
            until,
        };

        let rows = self.store.web_connectivity(&query).await?;
        let summary = summarize(&rows, &self.explorer_link);

        info!(
            country = %country,
            rows = rows.len(),
            total = summary.total_count,
            blocked = summary.blocked_count,
            "OONI measurements summarized"
        );
        Ok(summary)
    }
}
