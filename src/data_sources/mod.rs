//! Adapters for the three upstream censorship-signal sources.
//!
//! Each adapter fetches raw data, hands it to the matching classifier, and
//! returns a small structured result:
//!
//! - [`ioda`]: IODA outage alerts → [`OutageVerdict`]
//! - [`ooni`]: OONI metadb measurements → [`MeasurementSummary`](crate::measurements::MeasurementSummary)
//! - [`ripe`]: RIPEstat routing status → per-ASN [`AsnRoutingRecord`](crate::routing::AsnRoutingRecord)
//!
//! Adapters never swallow failures; they return a [`FetchError`](crate::error::FetchError)
//! and leave it to the report assembly to decide how to present it.

pub mod ioda;
pub mod ooni;
pub mod ripe;

pub use ioda::{IodaClient, OutageVerdict};
pub use ooni::OoniSource;
pub use ripe::RipeClient;
