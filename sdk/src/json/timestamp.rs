//! `google.protobuf.Timestamp` as an RFC 3339 string in UTC with millisecond
//! precision, e.g. `"2024-05-01T10:00:00.000Z"`. Any RFC 3339 offset is
//! accepted on input and normalized to UTC. An empty string reads as the
//! zero value (the Unix epoch), or as `None` for optional fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::Timestamp;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn format(value: &Timestamp) -> String {
    value.format(FORMAT).to_string()
}

/// Parses an RFC 3339 timestamp. An offset written without a colon (`+0200`)
/// is accepted, and a timestamp without any offset is taken to be UTC.
pub fn parse(text: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|value| value.with_timezone(&Utc))
        .or_else(|err| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .map_err(|_| err)
        })
}

struct Wrapped<T>(T);

impl Serialize for Wrapped<&Timestamp> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(self.0))
    }
}

impl<'de> Deserialize<'de> for Wrapped<Timestamp> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.is_empty() {
            return Ok(Wrapped(Timestamp::default()));
        }
        parse(&text)
            .map(Wrapped)
            .map_err(|err| de::Error::custom(format_args!("invalid timestamp {:?}: {}", text, err)))
    }
}

pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
    Wrapped(value).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    Wrapped::deserialize(deserializer).map(|w| w.0)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&Wrapped(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.is_empty() => parse(&text)
                .map(Some)
                .map_err(|err| de::Error::custom(format_args!("invalid timestamp {:?}: {}", text, err))),
            _ => Ok(None),
        }
    }
}

pub mod repeated {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[Timestamp], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(Wrapped))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Timestamp>, D::Error> {
        Ok(Vec::<Wrapped<Timestamp>>::deserialize(deserializer)?
            .into_iter()
            .map(|w| w.0)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "crate::json::timestamp")]
        at:    Timestamp,
        #[serde(with = "crate::json::timestamp::option")]
        until: Option<Timestamp>,
        #[serde(with = "crate::json::timestamp::repeated")]
        seen:  Vec<Timestamp>,
    }

    #[test]
    fn test_format_uses_milliseconds_and_z() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(format(&at), "2024-05-01T10:00:00.000Z");
        let at = at + chrono::Duration::microseconds(123_456);
        assert_eq!(format(&at), "2024-05-01T10:00:00.123Z");
    }

    #[test]
    fn test_parse_normalizes_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        for text in [
            "2024-05-01T10:00:00Z",
            "2024-05-01T10:00:00.000Z",
            "2024-05-01T12:00:00+02:00",
            "2024-05-01T05:30:00-04:30",
            "2024-05-01T12:00:00+0200",
            "2024-05-01T10:00:00",
        ] {
            assert_eq!(parse(text).unwrap(), expected, "{}", text);
        }
        assert!(parse("yesterday").is_err());
    }

    #[test]
    fn test_serde_forms() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let sample = Sample {
            at,
            until: None,
            seen: vec![at, at + chrono::Duration::milliseconds(5)],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(
            json,
            r#"{"at":"2024-05-01T10:00:00.000Z","until":null,"seen":["2024-05-01T10:00:00.000Z","2024-05-01T10:00:00.005Z"]}"#
        );
        assert_eq!(serde_json::from_str::<Sample>(&json).unwrap(), sample);

        let empty: Sample = serde_json::from_str(r#"{"at":"","until":"","seen":[]}"#).unwrap();
        assert_eq!(empty.at, Timestamp::default());
        assert_eq!(empty.until, None);

        let err = serde_json::from_str::<Sample>(r#"{"at":"soon","until":null,"seen":[]}"#).unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"), "{}", err);
    }
}
