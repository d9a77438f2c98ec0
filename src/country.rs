//! ISO 3166-1 country codes.

use isocountry::CountryCode;
use tracing::warn;

use crate::error::ValidationError;

/// Name reported for a code that has no ISO 3166-1 entry.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Validate an ISO 3166-1 alpha-2 code and normalize it to upper case.
///
/// Codes that are well-formed but unassigned (`XX`, `QQ`) are rejected.
pub fn validate_country(country: &str) -> Result<String, ValidationError> {
    let code = country.trim().to_ascii_uppercase();
    if code.len() != 2 || CountryCode::for_alpha2(&code).is_err() {
        return Err(ValidationError::InvalidCountry(country.to_string()));
    }
    Ok(code)
}

/// Full English name for an alpha-2 code, or [`UNKNOWN_COUNTRY`].
pub fn country_name(country: &str) -> &'static str {
    match CountryCode::for_alpha2(&country.trim().to_ascii_uppercase()) {
        Ok(code) => code.name(),
        Err(_) => {
            warn!(country = %country, "Code for country not found");
            UNKNOWN_COUNTRY
        }
    }
}
