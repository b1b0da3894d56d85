//! Time utilities shared across providers.

use crate::{Error, Result};
use chrono::Utc;

/// The instant type used for credential and token expirations. Always UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// The current instant.
pub fn now() -> DateTime {
    Utc::now()
}

/// Parse an ISO-8601 / RFC 3339 timestamp like `2019-12-18T21:27:58Z`.
///
/// Credential endpoints emit UTC timestamps; offsets other than `Z` are
/// accepted and normalized to UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::bad_expiration(format!("failed to parse timestamp `{s}`"))
                .with_source(anyhow::Error::new(e))
        })
}

/// Format an instant as `YYYY-MM-DDTHH:MM:SSZ`, the form used by the
/// credential endpoints.
pub fn format_rfc3339(dt: DateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_rfc3339("2030-01-01T00:00:00Z").expect("must parse");
        assert_eq!(dt.timestamp(), 1893456000);
    }

    #[test]
    fn test_parse_rfc3339_rejects_garbage() {
        let err = parse_rfc3339("not-a-timestamp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadExpiration);
    }

    #[test]
    fn test_format_round_trip() {
        let input = "2019-12-18T21:27:58Z";
        let dt = parse_rfc3339(input).expect("must parse");
        assert_eq!(format_rfc3339(dt), input);
    }
}
