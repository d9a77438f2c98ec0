//! Filtering and classification of OONI web-connectivity measurements.
//!
//! Rows come straight from the measurement store. Two kinds of rows are
//! dropped before anything is counted:
//!
//! - rows with ASN 0, which have no usable probe attribution (they usually
//!   lack a country as well);
//! - rows whose HTTP failure contains `unknown_failure`, a false positive
//!   produced by older OONI Probe releases
//!   (<https://github.com/ooni/probe-legacy/issues/38>).
//!
//! Everything that survives counts towards the total. A measurement is
//! anomalous when its `blocking` verdict is present and is anything other than
//! the literal string `"false"` (e.g. `"dns"`, `"tcp_ip"`, `"http-diff"`).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::template::LinkTemplate;

/// Marker left in `http_failure` by the buggy probe releases.
const UNKNOWN_FAILURE: &str = "unknown_failure";

/// A raw measurement row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMeasurement {
    pub measurement_time: String,
    pub report_id: String,
    pub asn: i64,
    pub country: String,
    pub ip: Option<String>,
    /// The URL that was tested.
    pub url: String,
    pub blocking: Option<String>,
    pub http_failure: Option<String>,
}

/// The blocking verdict of a measurement.
///
/// Upstream stores this as a nullable string where `"false"` means "not
/// blocked" and any other string names the blocking method. The raw value is
/// kept so it serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Blocking {
    NotBlocked,
    BlockedAs(String),
    Unknown,
}

impl Blocking {
    /// Whether this verdict makes the measurement anomalous.
    pub fn is_anomalous(&self) -> bool {
        matches!(self, Blocking::BlockedAs(_))
    }
}

impl From<Option<String>> for Blocking {
    fn from(raw: Option<String>) -> Self {
        match raw {
            None => Blocking::Unknown,
            Some(value) if value == "false" => Blocking::NotBlocked,
            Some(value) => Blocking::BlockedAs(value),
        }
    }
}

impl From<Blocking> for Option<String> {
    fn from(blocking: Blocking) -> Self {
        match blocking {
            Blocking::NotBlocked => Some("false".to_string()),
            Blocking::BlockedAs(method) => Some(method),
            Blocking::Unknown => None,
        }
    }
}

/// One surviving measurement as presented in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementEntry {
    /// Shareable OONI Explorer link for the measurement.
    pub url: String,
    pub blocking: Blocking,
}

/// Aggregate view of the measurements for one country and window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSummary {
    pub total_count: usize,
    pub blocked_count: usize,
    pub entries: Vec<MeasurementEntry>,
}

/// Reason a row was dropped, if any.
fn rejection(row: &ProbeMeasurement) -> Option<&'static str> {
    if row.asn == 0 {
        return Some("invalid ASN");
    }
    match &row.http_failure {
        Some(failure) if failure.contains(UNKNOWN_FAILURE) => Some("HTTP error"),
        _ => None,
    }
}

/// Percent-encode a URL the way OONI Explorer links expect it: everything
/// except unreserved characters and `/` is escaped.
pub fn encode_input(url: &str) -> String {
    urlencoding::encode(url).replace("%2F", "/")
}

/// Filter rows and compute the block-rate summary.
///
/// Row order is preserved in `entries`; nothing is deduplicated.
pub fn summarize(rows: &[ProbeMeasurement], explorer_link: &LinkTemplate) -> MeasurementSummary {
    let mut summary = MeasurementSummary::default();

    for row in rows {
        if let Some(reason) = rejection(row) {
            debug!(report_id = %row.report_id, reason, "Skipped measurement");
            continue;
        }

        let blocking = Blocking::from(row.blocking.clone());
        if blocking.is_anomalous() {
            summary.blocked_count += 1;
        }

        let input = encode_input(&row.url);
        let url = explorer_link.render(&[
            ("report_id", row.report_id.as_str()),
            ("input", input.as_str()),
        ]);

        summary.entries.push(MeasurementEntry { url, blocking });
    }

    summary.total_count = summary.entries.len();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPLORER: &str = "https://explorer.ooni.io/measurement/{report_id}?input={input}";

    const REPORT_CN_1: &str =
        "20200211T065336Z_AS4134_4M0eNXqQCp1mrHumzmR73pHhLRMyVh1dAc4VYcoICjBAkqjxlZ";
    const REPORT_CN_2: &str =
        "20200213T061554Z_AS45102_IVK2a2mfaXQTip5xHVezqfun2jnQo8auGA0D5JTEHK3ovOmrx1";

    fn row(
        report_id: &str,
        asn: i64,
        country: &str,
        url: &str,
        blocking: Option<&str>,
        http_failure: Option<&str>,
    ) -> ProbeMeasurement {
        ProbeMeasurement {
            measurement_time: "2020-02-11 06:53:37".to_string(),
            report_id: report_id.to_string(),
            asn,
            country: country.to_string(),
            ip: None,
            url: url.to_string(),
            blocking: blocking.map(str::to_string),
            http_failure: http_failure.map(str::to_string),
        }
    }

    fn fixture() -> Vec<ProbeMeasurement> {
        vec![
            row(
                REPORT_CN_1,
                4134,
                "CN",
                "https://zh.wikipedia.org/",
                Some("tcp_ip"),
                Some("generic_timeout_error"),
            ),
            row(
                REPORT_CN_2,
                45102,
                "CN",
                "https://fr.wikipedia.org/",
                Some("false"),
                None,
            ),
            row(
                REPORT_CN_1,
                0,
                "VN",
                "https://zh.wikipedia.org/",
                Some("tcp_ip"),
                Some("generic_timeout_error"),
            ),
            row(
                REPORT_CN_2,
                45102,
                "CA",
                "https://fr.wikipedia.org/",
                Some("false"),
                Some("unknown_failure"),
            ),
        ]
    }

    #[test]
    fn test_summarize_fixture() {
        let template = LinkTemplate::new(EXPLORER);
        let summary = summarize(&fixture(), &template);

        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.blocked_count, 1);
        assert_eq!(
            summary.entries,
            vec![
                MeasurementEntry {
                    url: format!(
                        "https://explorer.ooni.io/measurement/{REPORT_CN_1}?input=https%3A//zh.wikipedia.org/"
                    ),
                    blocking: Blocking::BlockedAs("tcp_ip".to_string()),
                },
                MeasurementEntry {
                    url: format!(
                        "https://explorer.ooni.io/measurement/{REPORT_CN_2}?input=https%3A//fr.wikipedia.org/"
                    ),
                    blocking: Blocking::NotBlocked,
                },
            ]
        );
    }

    #[test]
    fn test_zero_asn_excluded_from_all_counts() {
        let template = LinkTemplate::new(EXPLORER);
        let rows = vec![row("r", 0, "VN", "https://a.org/", Some("dns"), None)];

        let summary = summarize(&rows, &template);
        assert_eq!(summary, MeasurementSummary::default());
    }

    #[test]
    fn test_unknown_failure_substring_excluded() {
        let template = LinkTemplate::new(EXPLORER);
        let rows = vec![row(
            "r",
            1,
            "TR",
            "https://a.org/",
            Some("dns"),
            Some("eof_error unknown_failure: blah"),
        )];

        assert_eq!(summarize(&rows, &template).total_count, 0);
    }

    #[test]
    fn test_blocking_tri_state() {
        let template = LinkTemplate::new(EXPLORER);
        let rows = vec![
            row("a", 1, "TR", "https://a.org/", Some("false"), None),
            row("b", 1, "TR", "https://a.org/", None, None),
            row("c", 1, "TR", "https://a.org/", Some("dns"), None),
            // Any string other than the exact literal is a blocking method.
            row("d", 1, "TR", "https://a.org/", Some("False"), None),
        ];

        let summary = summarize(&rows, &template);
        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.blocked_count, 2);
        assert_eq!(summary.entries[0].blocking, Blocking::NotBlocked);
        assert_eq!(summary.entries[1].blocking, Blocking::Unknown);
    }

    #[test]
    fn test_other_http_failures_kept() {
        let template = LinkTemplate::new(EXPLORER);
        let rows = vec![row(
            "a",
            1,
            "TR",
            "https://a.org/",
            Some("http-failure"),
            Some("connection_reset"),
        )];

        let summary = summarize(&rows, &template);
        assert_eq!(summary.total_count, 1);
        assert_eq!(summary.blocked_count, 1);
    }

    #[test]
    fn test_blocking_serializes_to_raw_value() {
        assert_eq!(serde_json::to_string(&Blocking::NotBlocked).unwrap(), "\"false\"");
        assert_eq!(
            serde_json::to_string(&Blocking::BlockedAs("dns".to_string())).unwrap(),
            "\"dns\""
        );
        assert_eq!(serde_json::to_string(&Blocking::Unknown).unwrap(), "null");

        let parsed: Blocking = serde_json::from_str("\"false\"").unwrap();
        assert_eq!(parsed, Blocking::NotBlocked);
    }

    #[test]
    fn test_encode_input_keeps_slashes() {
        assert_eq!(
            encode_input("https://en.wikipedia.org/wiki/A B"),
            "https%3A//en.wikipedia.org/wiki/A%20B"
        );
    }
}
