//! 64-bit integers (`int64`, `uint64` and their fixed/zigzag variants) as
//! decimal strings, since JSON numbers lose precision past 2^53. Input may be
//! a string or a number.

use std::{fmt, marker::PhantomData, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// `i64` or `u64`.
pub trait Int64: Copy + fmt::Display + FromStr + TryFrom<i64> + TryFrom<u64> {}

impl Int64 for i64 {}
impl Int64 for u64 {}

struct Wrapped<T>(T);

impl<T: Int64> Serialize for Wrapped<&T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self.0)
    }
}

struct Int64Visitor<T>(PhantomData<T>);

impl<'de, T: Int64> de::Visitor<'de> for Int64Visitor<T>
where
    <T as FromStr>::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 64-bit integer as a string or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        value
            .trim()
            .parse()
            .map_err(|err| E::custom(format_args!("invalid integer {:?}: {}", value, err)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
        <T as TryFrom<i64>>::try_from(value).map_err(|_| E::custom(format_args!("integer {} is out of range", value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
        <T as TryFrom<u64>>::try_from(value).map_err(|_| E::custom(format_args!("integer {} is out of range", value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<T, E> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(E::custom(format_args!("{} is not an integer", value)));
        }
        if value < 0.0 {
            self.visit_i64(value as i64)
        } else {
            self.visit_u64(value as u64)
        }
    }
}

impl<'de, T: Int64> Deserialize<'de> for Wrapped<T>
where
    <T as FromStr>::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(Int64Visitor(PhantomData)).map(Wrapped)
    }
}

pub fn serialize<T: Int64, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    Wrapped(value).serialize(serializer)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Int64,
    <T as FromStr>::Err: fmt::Display,
    D: Deserializer<'de>,
{
    Wrapped::deserialize(deserializer).map(|w| w.0)
}

pub mod option {
    use super::*;

    pub fn serialize<T: Int64, S: Serializer>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&Wrapped(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Int64,
        <T as FromStr>::Err: fmt::Display,
        D: Deserializer<'de>,
    {
        Ok(Option::<Wrapped<T>>::deserialize(deserializer)?.map(|w| w.0))
    }
}

pub mod repeated {
    use super::*;

    pub fn serialize<T: Int64, S: Serializer>(values: &[T], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(Wrapped))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: Int64,
        <T as FromStr>::Err: fmt::Display,
        D: Deserializer<'de>,
    {
        Ok(Vec::<Wrapped<T>>::deserialize(deserializer)?
            .into_iter()
            .map(|w| w.0)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counters {
        #[serde(with = "crate::json::int64")]
        total:  i64,
        #[serde(with = "crate::json::int64")]
        bytes:  u64,
        #[serde(with = "crate::json::int64::option")]
        limit:  Option<i64>,
        #[serde(with = "crate::json::int64::repeated")]
        deltas: Vec<i64>,
    }

    #[test]
    fn test_serializes_as_strings() {
        let counters = Counters {
            total:  -9_007_199_254_740_993,
            bytes:  u64::MAX,
            limit:  Some(0),
            deltas: vec![1, -2],
        };
        let json = serde_json::to_string(&counters).unwrap();
        assert_eq!(
            json,
            r#"{"total":"-9007199254740993","bytes":"18446744073709551615","limit":"0","deltas":["1","-2"]}"#
        );
        assert_eq!(serde_json::from_str::<Counters>(&json).unwrap(), counters);
    }

    #[test]
    fn test_accepts_numbers() {
        let counters: Counters =
            serde_json::from_str(r#"{"total":-5,"bytes":7,"limit":null,"deltas":[3,"4",5.0]}"#).unwrap();
        assert_eq!(
            counters,
            Counters {
                total:  -5,
                bytes:  7,
                limit:  None,
                deltas: vec![3, 4, 5],
            }
        );
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = serde_json::from_str::<Counters>(r#"{"total":"1","bytes":-1,"limit":null,"deltas":[]}"#).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
        assert!(serde_json::from_str::<Counters>(r#"{"total":"1.5","bytes":"1","limit":null,"deltas":[]}"#).is_err());
    }
}
