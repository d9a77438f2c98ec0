//! cescout - A censorship-signal aggregator.
//!
//! # Overview
//!
//! cescout answers one question for a country and a time window: do public
//! measurement platforms show signs of Internet censorship or disruption?
//! It combines three independent signals:
//!
//! - **IODA** outage alerts, reduced to a yes/no/unknown outage verdict
//! - **OONI** web-connectivity measurements, filtered and summarized
//! - **RIPEstat** routing status, as per-ASN announced-prefix counts
//!
//! Each source succeeds or fails on its own; a report always carries all
//! three outcomes.
//!
//! # Modules
//!
//! - [`outage`]: Outage transition classifier over IODA alert levels
//! - [`measurements`]: OONI measurement filter and summarizer
//! - [`routing`]: Per-ASN routing-delta shaper
//! - [`data_sources`]: Upstream adapters (IODA, OONI metadb, RIPEstat)
//! - [`storage`]: Postgres access to the OONI metadb
//! - [`aggregation`]: Concurrent report assembly
//! - [`api`]: HTTP API handlers
//! - [`model`]: Report and request types
//! - [`config`], [`country`], [`dates`], [`error`], [`template`]: Supporting types

pub mod aggregation;
pub mod api;
pub mod config;
pub mod country;
pub mod data_sources;
pub mod dates;
pub mod error;
pub mod measurements;
pub mod model;
pub mod outage;
pub mod routing;
pub mod storage;
pub mod template;
