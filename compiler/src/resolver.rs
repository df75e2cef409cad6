use std::fmt;

use crate::{
    batch::SchemaBatch,
    types::{Enum, Message, SchemaUnit},
    error::ProtoError,
};

pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Timestamp,
}

impl ScalarKind {
    pub fn from_proto(type_ref: &str) -> Option<Self> {
        let kind = match type_ref {
            "double"   => ScalarKind::Double,
            "float"    => ScalarKind::Float,
            "int32"    => ScalarKind::Int32,
            "int64"    => ScalarKind::Int64,
            "uint32"   => ScalarKind::Uint32,
            "uint64"   => ScalarKind::Uint64,
            "sint32"   => ScalarKind::Sint32,
            "sint64"   => ScalarKind::Sint64,
            "fixed32"  => ScalarKind::Fixed32,
            "fixed64"  => ScalarKind::Fixed64,
            "sfixed32" => ScalarKind::Sfixed32,
            "sfixed64" => ScalarKind::Sfixed64,
            "bool"     => ScalarKind::Bool,
            "string"   => ScalarKind::String,
            "bytes"    => ScalarKind::Bytes,
            other if other.trim_start_matches('.') == TIMESTAMP_TYPE => ScalarKind::Timestamp,
            _ => return None,
        };
        Some(kind)
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            ScalarKind::Double => "f64",
            ScalarKind::Float => "f32",
            ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => "i32",
            ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => "i64",
            ScalarKind::Uint32 | ScalarKind::Fixed32 => "u32",
            ScalarKind::Uint64 | ScalarKind::Fixed64 => "u64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "::std::string::String",
            ScalarKind::Bytes => "::std::vec::Vec<u8>",
            ScalarKind::Timestamp => "::brine_proto::Timestamp",
        }
    }

    /// The `brine_proto::json` module that carries this scalar's JSON form,
    /// for scalars whose serde default is not the proto3 JSON mapping.
    pub fn json_module(self) -> Option<&'static str> {
        match self {
            ScalarKind::Int64
            | ScalarKind::Sint64
            | ScalarKind::Sfixed64
            | ScalarKind::Uint64
            | ScalarKind::Fixed64 => Some("int64"),
            ScalarKind::Bytes => Some("bytes"),
            ScalarKind::Timestamp => Some("timestamp"),
            _ => None,
        }
    }
}

/// Location of a message or enum: its file and its nesting path
/// (`["Outer", "Inner"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePath {
    pub file_id:  String,
    pub segments: Vec<String>,
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.segments.join("."))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TypeDef<'a> {
    Message(&'a Message),
    Enum(&'a Enum),
}

#[derive(Debug, Clone)]
pub enum ResolvedType<'a> {
    Scalar(ScalarKind),
    Message(TypePath, &'a Message),
    Enum(TypePath, &'a Enum),
}

impl<'a> ResolvedType<'a> {
    fn from_def(file_id: &str, segments: Vec<String>, def: TypeDef<'a>) -> Self {
        let path = TypePath {
            file_id: file_id.to_string(),
            segments,
        };
        match def {
            TypeDef::Message(message) => ResolvedType::Message(path, message),
            TypeDef::Enum(enum_) => ResolvedType::Enum(path, enum_),
        }
    }
}

/// Looks a type up by its exact nesting path inside one file.
pub fn find_type<'u>(unit: &'u SchemaUnit, segments: &[&str]) -> Option<TypeDef<'u>> {
    let (first, rest) = segments.split_first()?;
    if rest.is_empty() {
        if let Some(enum_) = unit.enums.iter().find(|e| e.name == *first) {
            return Some(TypeDef::Enum(enum_));
        }
    }
    let mut message = unit.messages.iter().find(|m| m.name == *first)?;
    for (i, segment) in rest.iter().enumerate() {
        if i == rest.len() - 1 {
            if let Some(enum_) = message.nested_enums.iter().find(|e| e.name == *segment) {
                return Some(TypeDef::Enum(enum_));
            }
        }
        message = message.nested_messages.iter().find(|m| m.name == *segment)?;
    }
    Some(TypeDef::Message(message))
}

/// Every message and enum of a file with its nesting path, parents before children.
pub fn walk_types(unit: &SchemaUnit) -> Vec<(Vec<String>, TypeDef<'_>)> {
    fn walk_message<'u>(message: &'u Message, prefix: &[String], out: &mut Vec<(Vec<String>, TypeDef<'u>)>) {
        let mut path = prefix.to_vec();
        path.push(message.name.clone());
        out.push((path.clone(), TypeDef::Message(message)));
        for nested in &message.nested_messages {
            walk_message(nested, &path, out);
        }
        for nested in &message.nested_enums {
            let mut enum_path = path.clone();
            enum_path.push(nested.name.clone());
            out.push((enum_path, TypeDef::Enum(nested)));
        }
    }

    let mut out = Vec::new();
    for message in &unit.messages {
        walk_message(message, &[], &mut out);
    }
    for enum_ in &unit.enums {
        out.push((vec![enum_.name.clone()], TypeDef::Enum(enum_)));
    }
    out
}

/// Every nested type of a file whose own name is `name`.
fn find_by_short_name<'u>(unit: &'u SchemaUnit, name: &str) -> Vec<(Vec<String>, TypeDef<'u>)> {
    walk_types(unit)
        .into_iter()
        .filter(|(path, _)| path.last().map(String::as_str) == Some(name))
        .collect()
}

/// Matches `package.Path` (or a bare path when the file has no package).
fn find_qualified<'u>(unit: &'u SchemaUnit, name: &str) -> Option<(Vec<String>, TypeDef<'u>)> {
    let rest = if unit.package.is_empty() {
        name
    } else {
        name.strip_prefix(unit.package.as_str())?.strip_prefix('.')?
    };
    let segments: Vec<&str> = rest.split('.').collect();
    let def = find_type(unit, &segments)?;
    Some((segments.iter().map(|s| s.to_string()).collect(), def))
}

fn is_imported(unit: &SchemaUnit, file_id: &str) -> bool {
    unit.imports.iter().any(|import| {
        import == file_id
            || file_id.ends_with(&format!("/{}", import))
            || import.ends_with(&format!("/{}", file_id))
    })
}

/// Maps textual type references to scalars, messages, or enums across a whole batch.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    batch: &'a SchemaBatch,
}

impl<'a> Resolver<'a> {
    pub fn new(batch: &'a SchemaBatch) -> Self {
        Resolver { batch }
    }

    pub fn batch(&self) -> &'a SchemaBatch {
        self.batch
    }

    /// Resolves `type_ref` as written in `file_id`, inside the message whose
    /// nesting path is `scope` (services pass `[Service, Rpc]`).
    ///
    /// Lookup order: scalars, then the enclosing scopes of the declaring file
    /// from the innermost out, then any type of the declaring file with that
    /// short name, then the other files of the batch. Two nested types sharing
    /// that short name in one file make the reference ambiguous. Several
    /// matches in other files are narrowed to the files imported by the
    /// declaring file; if that does not leave exactly one, the reference is
    /// ambiguous too.
    pub fn resolve(&self, type_ref: &str, file_id: &str, scope: &[String]) -> Result<ResolvedType<'a>, ProtoError> {
        if let Some(kind) = ScalarKind::from_proto(type_ref) {
            return Ok(ResolvedType::Scalar(kind));
        }

        let batch: &'a SchemaBatch = self.batch;
        let unit = batch
            .get(file_id)
            .ok_or_else(|| ProtoError::InvalidInput(format!("File \"{}\" is not part of the batch", file_id)))?;
        let qualified = type_ref.starts_with('.');
        let name = type_ref.trim_start_matches('.');
        let segments: Vec<&str> = name.split('.').collect();

        let referenced_from = || {
            if scope.is_empty() {
                file_id.to_string()
            } else {
                scope.join(".")
            }
        };

        if !qualified {
            for depth in (0..=scope.len()).rev() {
                let mut path: Vec<&str> = scope[..depth].iter().map(String::as_str).collect();
                path.extend(segments.iter().copied());
                if let Some(def) = find_type(unit, &path) {
                    let path = path.iter().map(|s| s.to_string()).collect();
                    return Ok(ResolvedType::from_def(file_id, path, def));
                }
            }
            if segments.len() == 1 {
                let mut matches = find_by_short_name(unit, name);
                if matches.len() > 1 {
                    return Err(ProtoError::AmbiguousType {
                        type_ref:        type_ref.to_string(),
                        referenced_from: referenced_from(),
                        candidates:      matches
                            .iter()
                            .map(|(path, _)| format!("{}:{}", file_id, path.join(".")))
                            .collect(),
                    });
                }
                if let Some((path, def)) = matches.pop() {
                    return Ok(ResolvedType::from_def(file_id, path, def));
                }
            }
        }
        if let Some((path, def)) = find_qualified(unit, name) {
            return Ok(ResolvedType::from_def(file_id, path, def));
        }

        let mut candidates = Vec::new();
        for (other_id, other) in batch.iter() {
            if other_id == file_id {
                continue;
            }
            let mut found: Vec<_> = find_qualified(other, name).into_iter().collect();
            if found.is_empty() && !qualified {
                found = find_type(other, &segments)
                    .map(|def| (segments.iter().map(|s| s.to_string()).collect(), def))
                    .into_iter()
                    .collect();
                if found.is_empty() && segments.len() == 1 {
                    found = find_by_short_name(other, name);
                }
            }
            candidates.extend(found.into_iter().map(|(path, def)| (other_id, path, def)));
        }

        if candidates.len() > 1 {
            let imported: Vec<_> = candidates
                .iter()
                .filter(|(other_id, _, _)| is_imported(unit, other_id))
                .cloned()
                .collect();
            if imported.len() == 1 {
                tracing::debug!(type_ref, file_id, "ambiguous reference settled by imports");
                candidates = imported;
            } else {
                return Err(ProtoError::AmbiguousType {
                    type_ref:        type_ref.to_string(),
                    referenced_from: referenced_from(),
                    candidates:      candidates
                        .iter()
                        .map(|(other_id, path, _)| format!("{}:{}", other_id, path.join(".")))
                        .collect(),
                });
            }
        }

        match candidates.pop() {
            Some((other_id, path, def)) => Ok(ResolvedType::from_def(other_id, path, def)),
            None => Err(ProtoError::UnresolvedType {
                type_ref:        type_ref.to_string(),
                referenced_from: referenced_from(),
            }),
        }
    }
}
