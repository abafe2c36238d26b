use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::AppError;

/// Fractional seconds are written only when present, so what a client reads
/// back is exactly the stored instant.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Current instant on the internal timeline (UTC, offset dropped).
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Parses a boundary timestamp into the internal naive representation.
///
/// Offset-qualified RFC 3339 values are shifted to UTC before the offset is
/// dropped; naive ISO-8601 values are taken as-is. `field` only feeds the
/// error message.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<NaiveDateTime, AppError> {
    let value = raw.trim();

    if let Ok(zoned) = DateTime::parse_from_rfc3339(value) {
        return Ok(zoned.naive_utc());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "{field} has invalid timestamp {raw:?}, expected ISO-8601"
            ))
        })
}

pub fn parse_required(field: &str, raw: Option<&str>) -> Result<NaiveDateTime, AppError> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse_timestamp(field, value),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

pub fn parse_optional(field: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    raw.map(|value| parse_timestamp(field, value)).transpose()
}

/// Serde adapter writing [`WIRE_FORMAT`] and reading anything
/// [`parse_timestamp`] accepts.
pub mod wire {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(super::WIRE_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp("timestamp", &raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Serialize};

    use super::{parse_optional, parse_required, parse_timestamp};
    use crate::error::AppError;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 21)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn utc_suffix_is_accepted() {
        let parsed = parse_timestamp("startDate", "2025-11-21T08:00:00.000Z").unwrap();
        assert_eq!(parsed, at(8, 0));
    }

    #[test]
    fn offset_is_normalized_to_utc() {
        let parsed = parse_timestamp("startDate", "2025-11-21T10:30:00+02:00").unwrap();
        assert_eq!(parsed, at(8, 30));
    }

    #[test]
    fn naive_forms_are_taken_as_is() {
        assert_eq!(parse_timestamp("d", "2025-11-21T08:00:00").unwrap(), at(8, 0));
        assert_eq!(parse_timestamp("d", "2025-11-21T08:00").unwrap(), at(8, 0));
        assert_eq!(parse_timestamp("d", "2025-11-21T08:00:00.250").unwrap().date(), at(8, 0).date());
    }

    #[test]
    fn garbage_is_a_validation_error() {
        let err = parse_timestamp("endDate", "next tuesday").unwrap_err();
        match err {
            AppError::Validation(message) => assert!(message.contains("endDate")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_required_value_is_rejected() {
        assert!(matches!(
            parse_required("startDate", None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_required("startDate", Some("  ")),
            Err(AppError::Validation(_))
        ));
        assert_eq!(parse_optional("endDate", None).unwrap(), None);
    }

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super::wire")]
        at: NaiveDateTime,
    }

    #[test]
    fn wire_format_keeps_subsecond_precision() {
        let precise = at(10, 0) + Duration::milliseconds(500);

        let json = serde_json::to_string(&Stamped { at: precise }).unwrap();
        assert_eq!(json, r#"{"at":"2025-11-21T10:00:00.500"}"#);

        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, precise);
    }

    #[test]
    fn whole_seconds_are_written_without_fraction() {
        let json = serde_json::to_string(&Stamped { at: at(8, 0) }).unwrap();
        assert_eq!(json, r#"{"at":"2025-11-21T08:00:00"}"#);
    }
}
