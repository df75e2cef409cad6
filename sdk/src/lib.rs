//! Runtime support for Rust code generated by `brine-proto-compiler`.
//!
//! Generated messages are plain structs deriving `serde::Serialize` and
//! `serde::Deserialize`. The field types whose proto3 JSON form differs from
//! serde's default (64-bit integers, bytes, timestamps and enums) point at the
//! `with` modules in [`json`], which can also be used directly:
//!
//! ```
//! use brine_proto::Timestamp;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Sample {
//!     #[serde(with = "brine_proto::json::timestamp")]
//!     at: Timestamp,
//!     #[serde(with = "brine_proto::json::int64")]
//!     count: i64,
//! }
//!
//! let sample: Sample = serde_json::from_str(r#"{"at":"2024-05-01T12:00:00+02:00","count":42}"#).unwrap();
//! assert_eq!(
//!     serde_json::to_string(&sample).unwrap(),
//!     r#"{"at":"2024-05-01T10:00:00.000Z","count":"42"}"#
//! );
//! ```

pub mod error;
pub mod json;
pub mod traits;

pub use chrono;

pub use error::UnknownEnumValue;
pub use traits::{ProtoEnum, Transport};

/// The well-known `google.protobuf.Timestamp`, always held in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// `skip_serializing_if` predicate for implicit-presence fields: a field at
/// its zero value is left out of the JSON object.
pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Route of an rpc relative to a service's base URL, `/<service>/<method>`.
pub fn method_path(service: &str, method: &str) -> String {
    format!("/{}/{}", service, method)
}
