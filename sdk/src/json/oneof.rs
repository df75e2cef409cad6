//! Oneof members flattened into their owning message.
//!
//! The owning struct collects every key it does not know and hands them to
//! [`deserialize`]. Keys naming a member of the oneof are decoded into the
//! oneof enum `T`; a malformed member value is an error, and so is a second
//! member of the same oneof. Keys that name no member are left to the other
//! flattened fields.

use std::{fmt, marker::PhantomData};

use serde::{
    de::{self, value::StringDeserializer, DeserializeSeed, EnumAccess, IgnoredAny, IntoDeserializer, MapAccess, VariantAccess, Visitor},
    Deserialize, Deserializer,
};

/// Reads at most one member of oneof `oneof` out of the remaining keys of a
/// message. `members` lists every accepted key (JSON names and schema names).
pub fn deserialize<'de, T, D>(deserializer: D, oneof: &'static str, members: &'static [&'static str]) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(OneofVisitor {
        oneof,
        members,
        marker: PhantomData,
    })
}

struct OneofVisitor<T> {
    oneof:   &'static str,
    members: &'static [&'static str],
    marker:  PhantomData<T>,
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for OneofVisitor<T> {
    type Value = Option<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object with at most one member of oneof `{}`", self.oneof)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Option<T>, A::Error> {
        let mut found: Option<(String, T)> = None;
        while let Some(key) = map.next_key::<String>()? {
            if !self.members.contains(&key.as_str()) {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            if let Some((first, _)) = &found {
                return Err(de::Error::custom(format_args!(
                    "oneof `{}` has more than one member set: `{}` and `{}`",
                    self.oneof, first, key
                )));
            }
            let value = map.next_value_seed(MemberSeed {
                key:    key.clone(),
                marker: PhantomData,
            })?;
            found = Some((key, value));
        }
        Ok(found.map(|(_, value)| value))
    }
}

/// Decodes one `key: value` entry as the externally tagged variant `key`.
struct MemberSeed<T> {
    key:    String,
    marker: PhantomData<T>,
}

impl<'de, T: Deserialize<'de>> DeserializeSeed<'de> for MemberSeed<T> {
    type Value = T;

    fn deserialize<D: Deserializer<'de>>(self, value: D) -> Result<T, D::Error> {
        T::deserialize(Member { key: self.key, value })
    }
}

struct Member<D> {
    key:   String,
    value: D,
}

impl<'de, D: Deserializer<'de>> Deserializer<'de> for Member<D> {
    type Error = D::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, D::Error> {
        visitor.visit_enum(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

impl<'de, D: Deserializer<'de>> EnumAccess<'de> for Member<D> {
    type Error = D::Error;
    type Variant = MemberValue<D>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, MemberValue<D>), D::Error> {
        let key: StringDeserializer<D::Error> = self.key.into_deserializer();
        let variant = seed.deserialize(key)?;
        Ok((variant, MemberValue(self.value)))
    }
}

struct MemberValue<D>(D);

impl<'de, D: Deserializer<'de>> VariantAccess<'de> for MemberValue<D> {
    type Error = D::Error;

    fn unit_variant(self) -> Result<(), D::Error> {
        IgnoredAny::deserialize(self.0).map(|_| ())
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, D::Error> {
        seed.deserialize(self.0)
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, D::Error> {
        self.0.deserialize_tuple(len, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value, D::Error> {
        self.0.deserialize_struct("", fields, visitor)
    }
}
