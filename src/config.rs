//! Runtime configuration, read from the environment once at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `CESCOUT_PORT` | `3000` |
//! | `CESCOUT_IODA_API_URL` | IODA alerts endpoint |
//! | `CESCOUT_IODA_VIEW_URL` | IODA dashboard link template |
//! | `CESCOUT_RIPE_API_URL` | `https://stat.ripe.net/data` |
//! | `CESCOUT_OONI_DATABASE_URL` | unset (OONI source disabled) |
//! | `CESCOUT_OONI_DOMAINS` | Wikimedia project domains |
//! | `CESCOUT_OONI_EXPLORER_URL` | OONI Explorer link template |
//! | `CESCOUT_FAILURE_POLICY` | `explicit` |
//!
//! The metadb connection is a single sqlx URL such as
//! `postgres://postgres@localhost/metadb`.

use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::data_sources::ioda::{IODA_API_URL, IODA_VIEW_URL};
use crate::data_sources::ooni::{DEFAULT_DOMAINS, EXPLORER_LINK};
use crate::data_sources::ripe::RIPE_API_URL;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// How source failures appear in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Failures are reported as failures.
    #[default]
    Explicit,
    /// Failures are reported as empty results, like a source with no data.
    Degrade,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(FailurePolicy::Explicit),
            "degrade" => Ok(FailurePolicy::Degrade),
            other => Err(format!("unknown failure policy: {other}")),
        }
    }
}

/// Immutable settings handed to each adapter at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub ioda_api_url: String,
    pub ioda_view_url: String,
    pub ripe_api_url: String,
    pub ooni_database_url: Option<String>,
    pub ooni_domains: Vec<String>,
    pub ooni_explorer_url: String,
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ioda_api_url: IODA_API_URL.to_string(),
            ioda_view_url: IODA_VIEW_URL.to_string(),
            ripe_api_url: RIPE_API_URL.to_string(),
            ooni_database_url: None,
            ooni_domains: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
            ooni_explorer_url: EXPLORER_LINK.to_string(),
            failure_policy: FailurePolicy::Explicit,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Values that fail to parse fall back to the
    /// default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = parse_or_default(get("CESCOUT_PORT"), "CESCOUT_PORT", defaults.port);
        let failure_policy = parse_or_default(
            get("CESCOUT_FAILURE_POLICY"),
            "CESCOUT_FAILURE_POLICY",
            defaults.failure_policy,
        );

        let ooni_domains = get("CESCOUT_OONI_DOMAINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.ooni_domains);

        Self {
            port,
            ioda_api_url: get("CESCOUT_IODA_API_URL").unwrap_or(defaults.ioda_api_url),
            ioda_view_url: get("CESCOUT_IODA_VIEW_URL").unwrap_or(defaults.ioda_view_url),
            ripe_api_url: get("CESCOUT_RIPE_API_URL").unwrap_or(defaults.ripe_api_url),
            ooni_database_url: get("CESCOUT_OONI_DATABASE_URL"),
            ooni_domains,
            ooni_explorer_url: get("CESCOUT_OONI_EXPLORER_URL")
                .unwrap_or(defaults.ooni_explorer_url),
            failure_policy,
        }
    }
}

fn parse_or_default<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %value, default = ?default, "Invalid setting; using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));

        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.ooni_domains.len(), 10);
        assert!(config.ooni_database_url.is_none());
        assert_eq!(config.failure_policy, FailurePolicy::Explicit);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CESCOUT_PORT", "8080"),
            ("CESCOUT_RIPE_API_URL", "http://localhost:9000"),
            ("CESCOUT_OONI_DATABASE_URL", "postgres://postgres@localhost/metadb"),
            ("CESCOUT_OONI_DOMAINS", "wikipedia.org, ,wikidata.org"),
            ("CESCOUT_FAILURE_POLICY", "Degrade"),
        ]));

        assert_eq!(config.port, 8080);
        assert_eq!(config.ripe_api_url, "http://localhost:9000");
        assert_eq!(
            config.ooni_database_url.as_deref(),
            Some("postgres://postgres@localhost/metadb")
        );
        assert_eq!(config.ooni_domains, vec!["wikipedia.org", "wikidata.org"]);
        assert_eq!(config.failure_policy, FailurePolicy::Degrade);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("CESCOUT_PORT", "not-a-port"),
            ("CESCOUT_FAILURE_POLICY", "sometimes"),
            ("CESCOUT_OONI_DATABASE_URL", "  "),
        ]));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.failure_policy, FailurePolicy::Explicit);
        assert!(config.ooni_database_url.is_none());
    }
}
