//! Routing deltas: current vs. historical announced IPv4 prefixes per ASN.
//!
//! A sharp drop in announced prefixes for a network inside the window is a
//! strong hint of a shutdown. Only ASNs that the routing registry attributes to
//! the queried country are reported.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FetchError;

/// Prefix counts for one ASN at three points in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnRoutingRecord {
    pub asn: u32,
    /// Prefixes announced right now.
    pub current_prefixes: u64,
    /// Prefixes announced at the start of the window.
    pub since_prefixes: u64,
    /// Prefixes announced at the end of the window.
    pub until_prefixes: u64,
}

/// Routing data needed to build deltas.
pub trait RoutingLookup {
    /// ASNs registered to a country.
    fn country_asns(&self, country: &str)
    -> impl Future<Output = Result<Vec<u32>, FetchError>> + Send;

    /// Announced IPv4 prefixes for an ASN, now (`None`) or at an ISO timestamp.
    fn prefix_count(
        &self,
        asn: u32,
        at: Option<&str>,
    ) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// Build the per-ASN comparison for the requested ASNs.
///
/// ASNs that do not belong to `country` are skipped with a warning. Any lookup
/// failure fails the whole call.
pub async fn build_deltas<L: RoutingLookup + Sync>(
    lookup: &L,
    country: &str,
    asns: &[u32],
    since: &str,
    until: &str,
) -> Result<BTreeMap<u32, AsnRoutingRecord>, FetchError> {
    let members = lookup.country_asns(country).await?;
    let mut deltas = BTreeMap::new();

    for &asn in asns {
        if !members.contains(&asn) {
            warn!(asn, country = %country, "ASN not registered in country; skipping");
            continue;
        }

        let (current, since_count, until_count) = tokio::try_join!(
            lookup.prefix_count(asn, None),
            lookup.prefix_count(asn, Some(since)),
            lookup.prefix_count(asn, Some(until)),
        )?;

        debug!(
            asn,
            current,
            since = since_count,
            until = until_count,
            "ASN prefixes"
        );

        deltas.insert(
            asn,
            AsnRoutingRecord {
                asn,
                current_prefixes: current,
                since_prefixes: since_count,
                until_prefixes: until_count,
            },
        );
    }

    Ok(deltas)
}
