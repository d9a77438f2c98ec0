//! RIPEstat client for BGP routing state.
//!
//! Two RIPEstat data calls are used:
//!
//! - `country-resource-list`: the ASNs registered to a country, used to make
//!   sure a requested ASN actually belongs to the queried country;
//! - `routing-status`: the number of IPv4 prefixes an ASN announces, either
//!   now or at a historical timestamp.
//!
//! IODA already folds BGP visibility into its outage signal, but does not
//! expose per-ASN prefix counts, which is what this source adds.
//!
//! # API Reference
//!
//! See: <https://stat.ripe.net/docs/data_api>

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::dates::TimeWindow;
use crate::error::FetchError;
use crate::routing::{AsnRoutingRecord, RoutingLookup, build_deltas};

/// Base URL for RIPEstat data calls.
pub const RIPE_API_URL: &str = "https://stat.ripe.net/data";

/// Client for RIPEstat's data API.
#[derive(Clone)]
pub struct RipeClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RipeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RipeClient {
    /// Create a new RIPEstat client with default settings.
    pub fn new() -> Self {
        Self::with_base_url(RIPE_API_URL)
    }

    /// Create a new client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET a data call and unwrap its `data` member.
    async fn fetch_data<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url = %url, "Requesting RIPEstat data");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let envelope = response.json::<RipeResponse<T>>().await?;
        Ok(envelope.data)
    }

    /// Current and historical prefix counts for `asns` registered in `country`.
    #[instrument(skip(self))]
    pub async fn routing_deltas(
        &self,
        country: &str,
        asns: &[u32],
        window: &TimeWindow,
    ) -> Result<BTreeMap<u32, AsnRoutingRecord>, FetchError> {
        let (since, until) = window.iso_bounds();
        let deltas = build_deltas(self, country, asns, &since, &until).await?;

        info!(
            country = %country,
            requested = asns.len(),
            reported = deltas.len(),
            "RIPEstat routing deltas built"
        );
        Ok(deltas)
    }
}

impl RoutingLookup for RipeClient {
    async fn country_asns(&self, country: &str) -> Result<Vec<u32>, FetchError> {
        let url = format!(
            "{}/country-resource-list/data.json?resource={}",
            self.base_url,
            urlencoding::encode(country)
        );
        let data: CountryResourceData = self.fetch_data(&url).await?;

        data.resources
            .asn
            .iter()
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| FetchError::MalformedResponse(format!("invalid ASN in resource list: {raw}")))
            })
            .collect()
    }

    async fn prefix_count(&self, asn: u32, at: Option<&str>) -> Result<u64, FetchError> {
        let url = match at {
            Some(time) => format!(
                "{}/routing-status/data.json?resource={}&timestamp={}",
                self.base_url,
                asn,
                urlencoding::encode(time)
            ),
            None => format!(
                "{}/routing-status/data.json?resource={}",
                self.base_url, asn
            ),
        };
        let data: RoutingStatusData = self.fetch_data(&url).await?;

        debug!(asn, query_time = %data.query_time, "RIPEstat query time");
        Ok(data.announced_space.v4.prefixes)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Envelope shared by all RIPEstat data calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RipeResponse<T> {
    #[serde(default)]
    pub status: String,
    pub data: T,
}

/// Payload of `country-resource-list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryResourceData {
    pub resources: CountryResources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryResources {
    /// ASNs as decimal strings.
    #[serde(default)]
    pub asn: Vec<String>,
}

/// Payload of `routing-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingStatusData {
    /// Time RIPEstat actually evaluated the query for.
    #[serde(default)]
    pub query_time: String,
    pub announced_space: AnnouncedSpace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncedSpace {
    pub v4: AnnouncedV4,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncedV4 {
    pub prefixes: u64,
}
