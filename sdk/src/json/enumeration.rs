//! Enums as their value names (`"ACCESS_LEVEL_PRIVATE"`). Input may be a
//! name or a number; `null` yields the zero value.

use std::{fmt, marker::PhantomData};

use serde::{de, Deserializer, Serializer};

use crate::ProtoEnum;

pub fn serialize<E: ProtoEnum, S: Serializer>(value: &E, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.name())
}

pub fn deserialize<'de, E: ProtoEnum, D: Deserializer<'de>>(deserializer: D) -> Result<E, D::Error> {
    deserializer.deserialize_any(EnumVisitor(PhantomData))
}

struct EnumVisitor<T>(PhantomData<T>);

impl<'de, T: ProtoEnum> de::Visitor<'de> for EnumVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an enum value name or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        T::from_name(value).ok_or_else(|| E::custom(format_args!("unknown enum value {:?}", value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
        i32::try_from(value)
            .ok()
            .and_then(T::from_number)
            .ok_or_else(|| E::custom(format_args!("unknown enum value {}", value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
        i32::try_from(value)
            .ok()
            .and_then(T::from_number)
            .ok_or_else(|| E::custom(format_args!("unknown enum value {}", value)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<T, E> {
        Ok(T::default())
    }
}
