//! serde `with` modules for the proto3 JSON mapping.
//!
//! Each of `int64`, `bytes` and `timestamp` handles a plain field and has
//! `option` and `repeated` submodules for `Option<T>` and `Vec<T>` fields.
//! `enumeration` and `oneof` back the impls emitted for enums and oneofs.

pub mod bytes;
pub mod enumeration;
pub mod int64;
pub mod oneof;
pub mod timestamp;
