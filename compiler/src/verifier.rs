use std::collections::HashSet;
use crate::{
    types::{Enum, Message, SchemaUnit},
    utils::quote,
    error::ProtoError,
};

pub const MAX_FIELD_NUMBER: i32 = 536_870_911;
pub const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<i32> = 19_000..=19_999;

/// Returns `Ok(())` if verification passed, or `Err(ProtoError::VerifierError(_))` otherwise.
pub fn verify_schema(unit: &SchemaUnit) -> Result<(), ProtoError> {
    // 1) Check duplicate type names at file scope
    check_unique_type_names(
        unit.messages.iter().map(|m| m.name.as_str()),
        unit.enums.iter().map(|e| e.name.as_str()),
        if unit.package.is_empty() { "file scope" } else { unit.package.as_str() },
    )?;

    // 2) Check every message, recursively
    for message in &unit.messages {
        verify_message(message, &message.name)?;
    }

    // 3) Check enums
    for enum_ in &unit.enums {
        verify_enum(enum_, &enum_.name)?;
    }

    // 4) Check services
    for service in &unit.services {
        let mut names = HashSet::new();
        for rpc in &service.rpcs {
            if !names.insert(rpc.name.as_str()) {
                return Err(ProtoError::VerifierError(format!(
                    "The rpc {} is defined twice in service {}",
                    quote(&rpc.name),
                    quote(&service.name)
                )));
            }
        }
    }

    Ok(())
}

fn check_unique_type_names<'a>(
    messages: impl Iterator<Item = &'a str>,
    enums: impl Iterator<Item = &'a str>,
    scope: &str,
) -> Result<(), ProtoError> {
    let mut defined = HashSet::new();
    for name in messages.chain(enums) {
        if !defined.insert(name) {
            return Err(ProtoError::VerifierError(format!(
                "The type {} is defined twice in {}",
                quote(name),
                quote(scope)
            )));
        }
    }
    Ok(())
}

fn verify_message(message: &Message, path: &str) -> Result<(), ProtoError> {
    let mut numbers = HashSet::new();
    let mut names = HashSet::new();

    for field in message.all_fields() {
        if !names.insert(field.name.as_str()) {
            return Err(ProtoError::VerifierError(format!(
                "The field {} is defined twice in {}",
                quote(&field.name),
                quote(path)
            )));
        }
        if !numbers.insert(field.number) {
            return Err(ProtoError::VerifierError(format!(
                "The number {} for field {} in {} is used twice",
                field.number,
                quote(&field.name),
                quote(path)
            )));
        }
        if field.number <= 0 || field.number > MAX_FIELD_NUMBER {
            return Err(ProtoError::VerifierError(format!(
                "The number for field {} in {} must be between 1 and {}",
                quote(&field.name),
                quote(path),
                MAX_FIELD_NUMBER
            )));
        }
        if RESERVED_FIELD_NUMBERS.contains(&field.number) {
            return Err(ProtoError::VerifierError(format!(
                "The number {} for field {} in {} is reserved",
                field.number,
                quote(&field.name),
                quote(path)
            )));
        }
    }

    let mut oneof_names = HashSet::new();
    for oneof in &message.oneofs {
        if !oneof_names.insert(oneof.name.as_str()) {
            return Err(ProtoError::VerifierError(format!(
                "The oneof {} is defined twice in {}",
                quote(&oneof.name),
                quote(path)
            )));
        }
    }

    check_unique_type_names(
        message.nested_messages.iter().map(|m| m.name.as_str()),
        message.nested_enums.iter().map(|e| e.name.as_str()),
        path,
    )?;

    for nested in &message.nested_messages {
        verify_message(nested, &format!("{}.{}", path, nested.name))?;
    }
    for nested in &message.nested_enums {
        verify_enum(nested, &format!("{}.{}", path, nested.name))?;
    }

    Ok(())
}

fn verify_enum(enum_: &Enum, path: &str) -> Result<(), ProtoError> {
    if enum_.values.is_empty() {
        return Err(ProtoError::VerifierError(format!(
            "The enum {} has no values",
            quote(path)
        )));
    }

    let zero_count = enum_.values.iter().filter(|v| v.number == 0).count();
    if zero_count != 1 {
        return Err(ProtoError::VerifierError(format!(
            "The enum {} must have exactly one value numbered 0, found {}",
            quote(path),
            zero_count
        )));
    }

    let mut names = HashSet::new();
    let mut numbers = HashSet::new();
    for value in &enum_.values {
        if !names.insert(value.name.as_str()) {
            return Err(ProtoError::VerifierError(format!(
                "The value {} is defined twice in enum {}",
                quote(&value.name),
                quote(path)
            )));
        }
        if !numbers.insert(value.number) {
            return Err(ProtoError::VerifierError(format!(
                "The number {} for value {} in enum {} is used twice",
                value.number,
                quote(&value.name),
                quote(path)
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_schema, tokenizer::tokenize_schema};

    fn verify(text: &str) -> Result<(), ProtoError> {
        let unit = parse_schema(&tokenize_schema(text).unwrap()).unwrap();
        verify_schema(&unit)
    }

    fn verifier_message(text: &str) -> String {
        match verify(text) {
            Err(ProtoError::VerifierError(msg)) => msg,
            other => panic!("expected a VerifierError but got {:?}", other),
        }
    }

    #[test]
    fn test_valid_schema_passes() {
        verify(
            r#"
            enum Kind { KIND_UNKNOWN = 0; KIND_A = 1; }
            message A {
              int32 x = 1;
              oneof o { string y = 2; Kind z = 3; }
              message B { int32 x = 1; }
            }
            service S { rpc Get(A) returns (A); }
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_oneof_members_share_field_numbers() {
        let msg = verifier_message("message A { int32 x = 1; oneof o { string y = 1; } }");
        assert!(msg.contains("used twice"), "{}", msg);
    }

    #[test]
    fn test_field_number_bounds() {
        assert!(verifier_message("message A { int32 x = 0; }").contains("between 1"));
        assert!(verifier_message("message A { int32 x = 19001; }").contains("reserved"));
    }

    #[test]
    fn test_enum_needs_exactly_one_zero() {
        assert!(verifier_message("enum E { A = 1; }").contains("exactly one value numbered 0"));
        assert!(verifier_message("message M { enum E { A = 0; B = 0; } }").contains("found 2"));
    }

    #[test]
    fn test_duplicate_types_in_scope() {
        let msg = verifier_message("message A { message B {} enum B { X = 0; } }");
        assert!(msg.contains("defined twice"), "{}", msg);
        // Same short name in different scopes is fine.
        verify("message A { message B {} } message C { message B {} }").unwrap();
    }

    #[test]
    fn test_duplicate_rpc() {
        let msg = verifier_message("service S { rpc A(M) returns (M); rpc A(M) returns (M); }");
        assert!(msg.contains("rpc"), "{}", msg);
    }
}
