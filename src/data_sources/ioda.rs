//! IODA (Internet Outage Detection and Analysis) client.
//!
//! IODA monitors the Internet in near real-time to identify macroscopic
//! outages at the country, region, and ASN level, combining BGP, active
//! probing, and darknet telescope signals.
//!
//! The alerts endpoint does not say whether a country experienced an outage.
//! Following the IODA developers' own definition, cescout looks for a
//! transition from `normal` to `warning` or `critical` in the country's
//! region-level alerts (see [`crate::outage`]).
//!
//! # API Reference
//!
//! See: <https://ioda.caida.org/ioda>

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::dates::TimeWindow;
use crate::error::FetchError;
use crate::outage::{AlertEvent, AlertLevel, classify};
use crate::template::LinkTemplate;

/// Default alerts endpoint.
pub const IODA_API_URL: &str = "https://ioda.caida.org/ioda/data/alerts";

/// Default dashboard link for a country and window.
pub const IODA_VIEW_URL: &str = "https://ioda.caida.org/ioda/dashboard#view=inspect&entity=country/{country}&lastView=overview&from={from}&until={until}";

/// The only `metaType` that carries country-wide signal.
const REGION_META_TYPE: &str = "region";

/// Client for IODA's alerts API.
#[derive(Clone)]
pub struct IodaClient {
    client: reqwest::Client,
    api_url: String,
    view_url: LinkTemplate,
}

impl Default for IodaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IodaClient {
    /// Create a new IODA client with default settings.
    pub fn new() -> Self {
        Self::with_urls(IODA_API_URL, IODA_VIEW_URL)
    }

    /// Create a client for a custom alerts endpoint and dashboard template.
    pub fn with_urls(api_url: &str, view_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            view_url: LinkTemplate::new(view_url),
        }
    }

    /// Fetch all alerts raised between `from` and `until` (Unix timestamps).
    pub async fn get_alerts(&self, from: i64, until: i64) -> Result<IodaAlertsResponse, FetchError> {
        let url = format!(
            "{}?human=true&from={}&until={}&annotateMeta=true",
            self.api_url, from, until
        );
        debug!(url = %url, "Requesting IODA alerts");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let data = response.json::<IodaAlertsResponse>().await?;
        Ok(data)
    }

    /// Dashboard link for a country and window.
    pub fn view_url(&self, country: &str, from: i64, until: i64) -> String {
        let (from, until) = (from.to_string(), until.to_string());
        self.view_url.render(&[
            ("country", country),
            ("from", from.as_str()),
            ("until", until.as_str()),
        ])
    }

    /// Decide whether `country` experienced an outage inside `window`.
    #[instrument(skip(self))]
    pub async fn outage(&self, country: &str, window: &TimeWindow) -> Result<OutageVerdict, FetchError> {
        let (from, until) = window.epochs();
        let response = self.get_alerts(from, until).await?;

        let events = region_events(&response, country);
        let assessment = classify(&events);

        info!(
            country = %country,
            events = events.len(),
            is_outage = ?assessment.as_ref().map(|a| a.is_outage),
            "IODA alerts classified"
        );

        Ok(OutageVerdict {
            is_outage: assessment.as_ref().map(|a| a.is_outage),
            evidence: assessment.map(|a| a.evidence).unwrap_or_default(),
            url: self.view_url(country, from, until),
        })
    }
}

/// Country-wide alert events for one country.
///
/// IODA also reports finer-grained (per-ASN) alerts; only `metaType ==
/// "region"` entries for `country` are kept. Alerts with a level outside
/// normal/warning/critical are kept as [`AlertLevel::Unrecognized`].
pub fn region_events(response: &IodaAlertsResponse, country: &str) -> Vec<AlertEvent> {
    response
        .data
        .alerts
        .iter()
        .filter(|alert| alert.meta_type == REGION_META_TYPE)
        .filter(|alert| alert.meta.attrs.country_code == country)
        .map(|alert| {
            let level = AlertLevel::from_upstream(&alert.level);
            debug!(fqid = %alert.meta.attrs.fqid, level = %alert.level, "Logging fqid");
            AlertEvent {
                time: alert.time,
                level,
                fqid: alert.meta.attrs.fqid.clone(),
            }
        })
        .collect()
}

/// Outage verdict for one country and window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutageVerdict {
    /// `None` when IODA had fewer than two alerts for the country.
    pub is_outage: Option<bool>,
    /// fqids of the warning/critical alerts that complete each outage onset.
    pub evidence: Vec<String>,
    /// IODA dashboard link for the country and window.
    pub url: String,
}

// ============================================================================
// Response types
// ============================================================================

/// Response from the IODA alerts endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IodaAlertsResponse {
    pub data: IodaAlertsData,
}

/// Payload of the alerts response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IodaAlertsData {
    #[serde(default)]
    pub alerts: Vec<IodaAlert>,
}

/// A single alert from IODA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IodaAlert {
    /// Granularity of the alert (e.g., "region", "asn").
    #[serde(default, rename = "metaType")]
    pub meta_type: String,

    #[serde(default)]
    pub meta: IodaAlertMeta,

    /// Unix timestamp of the alert.
    #[serde(default)]
    pub time: i64,

    /// Alert level ("normal", "warning", "critical").
    #[serde(default)]
    pub level: String,
}

/// Annotation attached to an alert when `annotateMeta=true`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IodaAlertMeta {
    #[serde(default)]
    pub attrs: IodaAlertAttrs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IodaAlertAttrs {
    #[serde(default)]
    pub country_code: String,

    #[serde(default)]
    pub fqid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::validate_date;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn region_alert(level: &str, country: &str, fqid: &str, time: i64) -> serde_json::Value {
        json!({
            "fqid": "bgp.v4.visibility_threshold.min_50%",
            "time": time,
            "level": level,
            "method": "last_value",
            "metaType": "region",
            "metaCode": "1870",
            "meta": {
                "name": "Some region",
                "attrs": {
                    "fqid": fqid,
                    "country_name": "Somewhere",
                    "country_code": country
                }
            }
        })
    }

    fn sample_response() -> serde_json::Value {
        json!({
            "type": "watchtower.alerts",
            "queryParameters": {
                "level": [],
                "from": "1580551200",
                "until": "1580637600"
            },
            "data": {
                "alerts": [
                    region_alert("normal", "IQ", "geo.netacuity.AS.IQ.1870", 1570070400),
                    region_alert("critical", "IQ", "geo.netacuity.AS.IQ.1859", 1570070400),
                    region_alert("critical", "LV", "geo.netacuity.EU.LV.2389", 1570070400),
                    region_alert("normal", "LV", "geo.netacuity.EU.LV.2389", 1570070400),
                    {
                        "time": 1570070000,
                        "level": "normal",
                        "metaType": "asn",
                        "meta": {"attrs": {"fqid": "asn.1", "country_code": "LV"}}
                    }
                ]
            }
        })
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            validate_date("2020-02-01T10:00:00").unwrap(),
            validate_date("2020-02-02T10:00:00").unwrap(),
        )
        .unwrap()
    }

    fn parsed_sample() -> IodaAlertsResponse {
        serde_json::from_value(sample_response()).unwrap()
    }

    #[test]
    fn test_region_events_filters_country_and_granularity() {
        let response = parsed_sample();

        let iq = region_events(&response, "IQ");
        assert_eq!(iq.len(), 2);
        assert_eq!(iq[1].fqid, "geo.netacuity.AS.IQ.1859");

        // The ASN-level LV alert is ignored.
        assert_eq!(region_events(&response, "LV").len(), 2);
        assert!(region_events(&response, "US").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_level_is_not_skipped_over() {
        let body = json!({
            "data": {"alerts": [
                region_alert("normal", "TR", "a", 1),
                region_alert("bogus", "TR", "b", 2),
                region_alert("warning", "TR", "c", 3),
                region_alert("normal", "SY", "d", 1),
                region_alert("bogus", "SY", "e", 2),
            ]}
        });
        let response: IodaAlertsResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(region_events(&response, "TR")[1].level, AlertLevel::Unrecognized);

        let server = mock_ioda(ResponseTemplate::new(200).set_body_json(body)).await;
        let client = IodaClient::with_urls(&format!("{}/alerts", server.uri()), IODA_VIEW_URL);

        let tr = client.outage("TR", &window()).await.unwrap();
        assert_eq!(tr.is_outage, Some(false));
        assert!(tr.evidence.is_empty());

        let sy = client.outage("SY", &window()).await.unwrap();
        assert_eq!(sy.is_outage, Some(false));
    }

    #[test]
    fn test_view_url() {
        let client = IodaClient::new();
        assert_eq!(
            client.view_url("IQ", 1580551200, 1580637600),
            "https://ioda.caida.org/ioda/dashboard#view=inspect&entity=country/IQ&lastView=overview&from=1580551200&until=1580637600"
        );
    }

    async fn mock_ioda(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts"))
            .and(query_param("from", "1580551200"))
            .and(query_param("until", "1580637600"))
            .and(query_param("annotateMeta", "true"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_outage_verdicts() {
        let server = mock_ioda(ResponseTemplate::new(200).set_body_json(sample_response())).await;
        let client = IodaClient::with_urls(&format!("{}/alerts", server.uri()), IODA_VIEW_URL);

        let iq = client.outage("IQ", &window()).await.unwrap();
        assert_eq!(iq.is_outage, Some(true));
        assert_eq!(iq.evidence, vec!["geo.netacuity.AS.IQ.1859".to_string()]);
        assert_eq!(iq.url, client.view_url("IQ", 1580551200, 1580637600));

        let lv = client.outage("LV", &window()).await.unwrap();
        assert_eq!(lv.is_outage, Some(false));

        let us = client.outage("US", &window()).await.unwrap();
        assert_eq!(us.is_outage, None);
        assert!(us.evidence.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_transport_failure() {
        let server = mock_ioda(ResponseTemplate::new(503)).await;
        let client = IodaClient::with_urls(&format!("{}/alerts", server.uri()), IODA_VIEW_URL);

        let err = client.outage("IQ", &window()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_unexpected_body_is_malformed() {
        let server =
            mock_ioda(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"}))).await;
        let client = IodaClient::with_urls(&format!("{}/alerts", server.uri()), IODA_VIEW_URL);

        let err = client.outage("IQ", &window()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::MalformedResponse);
    }
}
