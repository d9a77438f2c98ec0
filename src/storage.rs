//! Read-only access to a local copy of OONI's `metadb`.
//!
//! The store is expected to be a synced PostgreSQL replica. cescout only ever
//! reads from it: there is no schema management and no writes.
//!
//! Every selected column is cast in SQL (`::text`, `::bigint`) so decoding
//! does not depend on the exact column types of a given metadb release.

use std::future::Future;

use chrono::NaiveDateTime;
use sqlx::FromRow;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use crate::error::FetchError;
use crate::measurements::ProbeMeasurement;

/// Web-connectivity measurements for a set of URL patterns, one country, and
/// an inclusive range of test start times.
const MEASUREMENT_QUERY: &str = r#"
    SELECT measurement.measurement_start_time::text AS measurement_start_time,
           report.report_id::text AS report_id,
           report.probe_asn::bigint AS probe_asn,
           report.probe_cc::text AS probe_cc,
           report.probe_ip::text AS probe_ip,
           input.input::text AS input,
           http_verdict.blocking::text AS blocking,
           http_verdict.http_experiment_failure::text AS http_experiment_failure
      FROM measurement
      JOIN input ON input.input_no = measurement.input_no
      JOIN report ON report.report_no = measurement.report_no
      JOIN http_verdict ON http_verdict.msm_no = measurement.msm_no
     WHERE report.test_name = 'web_connectivity'
       AND input.input LIKE ANY($1)
       AND report.probe_cc = $2
       AND report.test_start_time >= $3
       AND report.test_start_time <= $4
"#;

/// Parameters for a measurement query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementQuery {
    pub country: String,
    /// Domains to match; each becomes a `%domain%` pattern.
    pub domains: Vec<String>,
    pub since: NaiveDateTime,
    pub until: NaiveDateTime,
}

impl MeasurementQuery {
    /// `LIKE` patterns for the configured domains.
    pub fn patterns(&self) -> Vec<String> {
        self.domains.iter().map(|d| format!("%{d}%")).collect()
    }
}

/// A source of raw measurement rows.
pub trait MeasurementStore {
    fn web_connectivity(
        &self,
        query: &MeasurementQuery,
    ) -> impl Future<Output = Result<Vec<ProbeMeasurement>, FetchError>> + Send;
}

#[derive(Debug, FromRow)]
struct MeasurementRow {
    measurement_start_time: Option<String>,
    report_id: String,
    probe_asn: Option<i64>,
    probe_cc: Option<String>,
    probe_ip: Option<String>,
    input: String,
    blocking: Option<String>,
    http_experiment_failure: Option<String>,
}

impl From<MeasurementRow> for ProbeMeasurement {
    fn from(row: MeasurementRow) -> Self {
        ProbeMeasurement {
            measurement_time: row.measurement_start_time.unwrap_or_default(),
            report_id: row.report_id,
            // A missing ASN is treated like the 0 sentinel and filtered later.
            asn: row.probe_asn.unwrap_or(0),
            country: row.probe_cc.unwrap_or_default(),
            ip: row.probe_ip,
            url: row.input,
            blocking: row.blocking,
            http_failure: row.http_experiment_failure,
        }
    }
}

/// Connection pool wrapper for the metadb replica.
#[derive(Clone)]
pub struct MetadbStore {
    pool: PgPool,
}

impl MetadbStore {
    /// Create a store for a `postgres://` connection URL.
    ///
    /// The pool connects lazily, so an unreachable database is reported when
    /// the first query runs rather than at startup.
    pub fn connect_lazy(database_url: &str) -> Result<Self, FetchError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }
}

impl MeasurementStore for MetadbStore {
    async fn web_connectivity(
        &self,
        query: &MeasurementQuery,
    ) -> Result<Vec<ProbeMeasurement>, FetchError> {
        let patterns = query.patterns();
        debug!(
            country = %query.country,
            since = %query.since,
            until = %query.until,
            patterns = ?patterns,
            "Querying metadb"
        );

        let rows: Vec<MeasurementRow> = sqlx::query_as(MEASUREMENT_QUERY)
            .bind(&patterns)
            .bind(&query.country)
            .bind(query.since)
            .bind(query.until)
            .fetch_all(&self.pool)
            .await?;

        debug!(rows = rows.len(), "Fetched measurements from metadb");
        Ok(rows.into_iter().map(ProbeMeasurement::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::validate_date;

    #[test]
    fn test_patterns_wrap_domains() {
        let query = MeasurementQuery {
            country: "CN".to_string(),
            domains: vec!["wikipedia.org".to_string(), "wikidata.org".to_string()],
            since: validate_date("2020-02-01").unwrap(),
            until: validate_date("2020-02-02").unwrap(),
        };

        assert_eq!(
            query.patterns(),
            vec!["%wikipedia.org%".to_string(), "%wikidata.org%".to_string()]
        );
    }

    #[test]
    fn test_query_filters_web_connectivity() {
        assert!(MEASUREMENT_QUERY.contains("test_name = 'web_connectivity'"));
        assert!(MEASUREMENT_QUERY.contains("LIKE ANY($1)"));
        assert!(MEASUREMENT_QUERY.contains("probe_cc = $2"));
    }

    #[test]
    fn test_row_conversion_defaults_missing_asn_to_zero() {
        let row = MeasurementRow {
            measurement_start_time: None,
            report_id: "r".to_string(),
            probe_asn: None,
            probe_cc: None,
            probe_ip: None,
            input: "https://a.org/".to_string(),
            blocking: Some("dns".to_string()),
            http_experiment_failure: None,
        };

        let measurement = ProbeMeasurement::from(row);
        assert_eq!(measurement.asn, 0);
        assert_eq!(measurement.blocking.as_deref(), Some("dns"));
    }

    #[tokio::test]
    async fn test_connect_lazy_rejects_bad_url() {
        assert!(MetadbStore::connect_lazy("not a url").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_database_is_database_error() {
        let store = MetadbStore {
            pool: PgPoolOptions::new()
                .acquire_timeout(std::time::Duration::from_millis(200))
                .connect_lazy("postgres://cescout@127.0.0.1:1/metadb")
                .unwrap(),
        };
        let query = MeasurementQuery {
            country: "CN".to_string(),
            domains: vec!["wikipedia.org".to_string()],
            since: validate_date("2020-02-01").unwrap(),
            until: validate_date("2020-02-02").unwrap(),
        };

        let result = store.web_connectivity(&query).await;
        assert!(matches!(result, Err(FetchError::Database(_))));
    }
}
