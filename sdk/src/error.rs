use thiserror::Error;

/// A number with no matching value in a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown enum value: {0}")]
pub struct UnknownEnumValue(pub i32);
