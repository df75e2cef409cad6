//! `bytes` fields as base64 strings. Output uses the standard alphabet with
//! padding; input may use the standard or URL-safe alphabet, padded or not.

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    DecodeError, Engine as _,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

pub fn encode(value: &[u8]) -> String {
    STANDARD.encode(value)
}

pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD_LENIENT
        .decode(text)
        .or_else(|err| URL_SAFE_LENIENT.decode(text).map_err(|_| err))
}

struct Wrapped<T>(T);

impl Serialize for Wrapped<&Vec<u8>> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Wrapped<Vec<u8>> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode(&text)
            .map(Wrapped)
            .map_err(|err| de::Error::custom(format_args!("invalid base64: {}", err)))
    }
}

pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    Wrapped::deserialize(deserializer).map(|w| w.0)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&Wrapped(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Ok(Option::<Wrapped<Vec<u8>>>::deserialize(deserializer)?.map(|w| w.0))
    }
}

pub mod repeated {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(Wrapped))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        Ok(Vec::<Wrapped<Vec<u8>>>::deserialize(deserializer)?
            .into_iter()
            .map(|w| w.0)
            .collect())
    }
}
