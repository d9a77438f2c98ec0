//! Report assembly across the three sources.
//!
//! Sources are independent: each one runs concurrently, and a failure in one
//! never prevents the others from reporting. With
//! [`FailurePolicy::Degrade`] failures are folded into empty results instead
//! of being reported.

use tracing::{info, warn};

use crate::config::{Config, FailurePolicy};
use crate::country::country_name;
use crate::data_sources::{IodaClient, OoniSource, OutageVerdict, RipeClient};
use crate::dates::time_now;
use crate::error::FetchError;
use crate::measurements::MeasurementSummary;
use crate::model::{Report, ReportRequest, RoutingDeltas, SourceName, SourceOutcome};
use crate::storage::{MeasurementStore, MetadbStore};

/// A single source's outcome, for the per-source endpoint.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum AnySourceOutcome {
    Ioda(SourceOutcome<OutageVerdict>),
    Ooni(SourceOutcome<MeasurementSummary>),
    Ripe(SourceOutcome<RoutingDeltas>),
}

/// Runs all sources for a request and assembles the report.
#[derive(Clone)]
pub struct Aggregator<S = MetadbStore> {
    ioda: IodaClient,
    ripe: RipeClient,
    ooni: Result<OoniSource<S>, String>,
    policy: FailurePolicy,
}

impl Aggregator<MetadbStore> {
    /// Build the aggregator from configuration.
    ///
    /// A missing or invalid metadb setting disables only the OONI source; it
    /// is reported as a configuration failure on every request.
    pub fn from_config(config: &Config) -> Self {
        let ooni = match &config.ooni_database_url {
            None => Err("CESCOUT_OONI_DATABASE_URL is not set".to_string()),
            Some(url) => MetadbStore::connect_lazy(url)
                .and_then(|store| {
                    OoniSource::new(
                        store,
                        config.ooni_domains.clone(),
                        &config.ooni_explorer_url,
                    )
                })
                .map_err(|e| e.to_string()),
        };

        if let Err(reason) = &ooni {
            warn!(reason = %reason, "OONI source unavailable");
        }

        Self {
            ioda: IodaClient::with_urls(&config.ioda_api_url, &config.ioda_view_url),
            ripe: RipeClient::with_base_url(&config.ripe_api_url),
            ooni,
            policy: config.failure_policy,
        }
    }
}

impl<S: MeasurementStore + Sync> Aggregator<S> {
    /// Assemble an aggregator from already-built parts.
    ///
    /// `ooni` is `None` when the measurement store is not configured.
    pub fn new(
        ioda: IodaClient,
        ripe: RipeClient,
        ooni: Option<OoniSource<S>>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            ioda,
            ripe,
            ooni: ooni.ok_or_else(|| "no measurement store configured".to_string()),
            policy,
        }
    }

    async fn run_ioda(&self, request: &ReportRequest) -> SourceOutcome<OutageVerdict> {
        let result = self.ioda.outage(&request.country, &request.window).await;
        let outcome = self.finish(SourceName::Ioda, result);

        let (from, until) = request.window.epochs();
        let url = self.ioda.view_url(&request.country, from, until);
        self.apply_policy(outcome, || OutageVerdict {
            url,
            ..OutageVerdict::default()
        })
    }

    async fn run_ooni(&self, request: &ReportRequest) -> SourceOutcome<MeasurementSummary> {
        let result = match &self.ooni {
            Ok(source) => source.measurements(&request.country, &request.window).await,
            Err(reason) => Err(FetchError::NotConfigured(reason.clone())),
        };
        let outcome = self.finish(SourceName::Ooni, result);
        self.apply_policy(outcome, MeasurementSummary::default)
    }

    async fn run_ripe(&self, request: &ReportRequest) -> SourceOutcome<RoutingDeltas> {
        let Some(asns) = &request.asns else {
            warn!(country = %request.country, "No ASNs specified; skipping RIPEstat");
            return SourceOutcome::Skipped {
                reason: "no ASNs specified".to_string(),
            };
        };

        let result = self
            .ripe
            .routing_deltas(&request.country, asns, &request.window)
            .await;
        let outcome = self.finish(SourceName::Ripe, result);
        self.apply_policy(outcome, RoutingDeltas::new)
    }

    /// Log a failed fetch and wrap the result.
    fn finish<T>(&self, source: SourceName, result: Result<T, FetchError>) -> SourceOutcome<T> {
        if let Err(e) = &result {
            warn!(source = %source, kind = ?e.kind(), error = %e, "Source failed");
        }
        SourceOutcome::from_result(result)
    }

    fn apply_policy<T, F: FnOnce() -> T>(&self, outcome: SourceOutcome<T>, empty: F) -> SourceOutcome<T> {
        match self.policy {
            FailurePolicy::Explicit => outcome,
            FailurePolicy::Degrade => outcome.degrade_with(empty),
        }
    }

    /// Run all three sources concurrently and assemble the report.
    pub async fn report(&self, request: &ReportRequest) -> Report {
        let (ioda, ooni, ripe) = tokio::join!(
            self.run_ioda(request),
            self.run_ooni(request),
            self.run_ripe(request),
        );

        let report = Report {
            country: request.country.clone(),
            country_name: country_name(&request.country).to_string(),
            since: request.window.since,
            until: request.window.until,
            generated_at: time_now(),
            ioda,
            ooni,
            ripe,
        };

        info!(
            country = %report.country,
            successful_sources = report.successful_sources(),
            "Report assembled"
        );
        report
    }

    /// Run a single source.
    pub async fn source(&self, name: SourceName, request: &ReportRequest) -> AnySourceOutcome {
        match name {
            SourceName::Ioda => AnySourceOutcome::Ioda(self.run_ioda(request).await),
            SourceName::Ooni => AnySourceOutcome::Ooni(self.run_ooni(request).await),
            SourceName::Ripe => AnySourceOutcome::Ripe(self.run_ripe(request).await),
        }
    }
}
