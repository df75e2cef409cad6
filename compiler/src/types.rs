use std::fmt;

use serde::Serialize;

/// One parsed `.proto` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaUnit {
    pub syntax:      Option<String>,
    pub package:     String,
    /// Set by `option rust_module = "...";`.
    pub namespace:   Option<String>,
    pub imports:     Vec<String>,
    pub messages:    Vec<Message>,
    pub enums:       Vec<Enum>,
    pub services:    Vec<Service>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub name:            String,
    pub line:            usize,
    pub column:          usize,
    pub fields:          Vec<Field>,
    pub oneofs:          Vec<Oneof>,
    pub nested_messages: Vec<Message>,
    pub nested_enums:    Vec<Enum>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:          String,
    pub line:          usize,
    pub column:        usize,
    pub type_:         String,
    pub number:        i32,
    pub is_optional:   bool,
    pub is_repeated:   bool,
    pub is_deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Oneof {
    pub name:   String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue {
    pub name:          String,
    pub number:        i32,
    pub is_deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name: String,
    pub rpcs: Vec<Rpc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rpc {
    pub name:          String,
    pub request_type:  String,
    pub response_type: String,
}

/// A statement the parser skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub line:    usize,
    pub column:  usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

impl Message {
    /// Every field of the message, direct fields first, then oneof members.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .chain(self.oneofs.iter().flat_map(|oneof| oneof.fields.iter()))
    }
}
