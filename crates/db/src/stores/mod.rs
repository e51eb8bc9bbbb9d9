use chrono::{DateTime, SecondsFormat, Utc};

use trolley_core::store::StoreError;

pub mod document;
pub mod relational;

pub use document::DocumentCartStore;
pub use relational::RelationalCartStore;

pub(crate) fn unavailable(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

/// Timestamps are persisted as fixed-width RFC 3339 strings (microsecond
/// precision, `Z` suffix) so lexicographic ordering in SQL matches
/// chronological ordering.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|error| StoreError::Decode(format!("bad timestamp `{raw}`: {error}")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{decode_ts, encode_ts};

    #[test]
    fn timestamps_round_trip_at_microsecond_precision() {
        let now = Utc::now();
        let encoded = encode_ts(&now);

        assert!(encoded.ends_with('Z'));
        assert_eq!(encoded.len(), "2026-01-01T00:00:00.000000Z".len());

        let decoded = decode_ts(&encoded).expect("decode");
        assert_eq!(encode_ts(&decoded), encoded);
    }

    #[test]
    fn garbage_timestamp_is_a_decode_error() {
        assert!(decode_ts("not-a-timestamp").is_err());
    }
}
