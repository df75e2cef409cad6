use std::collections::{HashMap, HashSet};

use crate::{
    batch::{file_stem, SchemaBatch},
    error::ProtoError,
    resolver::{ResolvedType, Resolver, TypePath},
    types::{Enum, Field, Message, Oneof, SchemaUnit, Service},
    utils::{escape_rust_keyword, to_json_name, to_pascal_case, to_snake_case},
};

/// Generated Rust source for one `.proto` file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedUnit {
    pub file_id:     String,
    /// `<stem>.g.rs`
    pub file_name:   String,
    /// Module the code expects to be mounted as.
    pub module_name: String,
    pub code:        String,
}

/// Compiles one file of the batch into Rust type definitions with serde JSON
/// bindings. Returns `Ok(None)` for a file with no messages and no enums.
pub fn generate_rust(file_id: &str, batch: &SchemaBatch) -> Result<Option<GeneratedUnit>, ProtoError> {
    let unit = batch
        .get(file_id)
        .ok_or_else(|| ProtoError::InvalidInput(format!("File \"{}\" is not part of the batch", file_id)))?;

    if unit.messages.is_empty() && unit.enums.is_empty() {
        return Ok(None);
    }

    let mut emitter = Emitter {
        resolver: Resolver::new(batch),
        file_id,
        unit,
        code: CodeWriter::default(),
    };
    emitter.emit_file()?;

    Ok(Some(GeneratedUnit {
        file_id:     file_id.to_string(),
        file_name:   format!("{}.g.rs", file_stem(file_id)),
        module_name: batch.module_name(file_id),
        code:        emitter.code.finish(),
    }))
}

/// Identifier of a generated type.
fn type_ident(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

/// Identifier of the module holding a message's nested types.
fn module_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

fn field_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Inherent methods every service client already has.
const CLIENT_METHODS: [&str; 3] = ["new", "transport", "into_inner"];

/// Method name of an rpc on its client; `_rpc` is appended when the name is
/// taken by one of the client's own methods.
fn rpc_ident(name: &str) -> String {
    let ident = field_ident(name);
    if CLIENT_METHODS.contains(&ident.as_str()) {
        format!("{}_rpc", ident)
    } else {
        ident
    }
}

/// Identifier of a oneof's enum inside its owner's module. `Oneof` is
/// appended while the name or its `Case` twin is taken by a nested type.
fn oneof_ident(message: &Message, oneof: &Oneof) -> String {
    let taken: HashSet<String> = message
        .nested_messages
        .iter()
        .map(|m| type_ident(&m.name))
        .chain(message.nested_enums.iter().map(|e| type_ident(&e.name)))
        .collect();
    let mut name = type_ident(&oneof.name);
    while taken.contains(&name) || taken.contains(&format!("{}Case", name)) {
        name.push_str("Oneof");
    }
    name
}

#[derive(Default)]
struct CodeWriter {
    lines:  Vec<String>,
    indent: usize,
}

impl CodeWriter {
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.indent), text));
        }
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self, text: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    fn finish(mut self) -> String {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        let mut code = self.lines.join("\n");
        code.push('\n');
        code
    }
}

/// How a field is stored in its struct.
struct FieldShape {
    rust_type: String,
    serde:     Vec<String>,
}

struct Emitter<'a> {
    resolver: Resolver<'a>,
    file_id:  &'a str,
    unit:     &'a SchemaUnit,
    code:     CodeWriter,
}

impl<'a> Emitter<'a> {
    fn emit_file(&mut self) -> Result<(), ProtoError> {
        let unit = self.unit;
        let module_name = self.resolver.batch().module_name(self.file_id);

        self.code.line(format!("// @generated by brine-proto from `{}`. Do not edit.", self.file_id));
        if !unit.package.is_empty() {
            self.code.line(format!("// Package: {}", unit.package));
        }
        self.code.line("//");
        self.code.line(format!(
            "// Mount as `mod {}` next to the other generated files of the same run.",
            module_name
        ));
        self.code.line("");

        for message in &unit.messages {
            self.emit_message(message, &[])?;
        }
        for enum_ in &unit.enums {
            self.emit_enum(enum_, &[]);
        }
        for service in &unit.services {
            self.emit_service(service)?;
        }
        Ok(())
    }

    fn full_name(&self, segments: &[String]) -> String {
        if self.unit.package.is_empty() {
            segments.join(".")
        } else {
            format!("{}.{}", self.unit.package, segments.join("."))
        }
    }

    /// Renders a path to `target` as seen from the module `current_mods`
    /// (module idents relative to the root of this file's generated code).
    fn render_path(&self, target: &TypePath, current_mods: &[String]) -> String {
        let (last, parents) = match target.segments.split_last() {
            Some(split) => split,
            None => return String::new(),
        };
        let target_mods: Vec<String> = parents.iter().map(|s| module_ident(s)).collect();

        let mut parts: Vec<String> = Vec::new();
        if target.file_id == self.file_id {
            let common = current_mods
                .iter()
                .zip(&target_mods)
                .take_while(|(a, b)| a == b)
                .count();
            parts.extend(std::iter::repeat("super".to_string()).take(current_mods.len() - common));
            parts.extend(target_mods[common..].iter().cloned());
        } else {
            parts.extend(std::iter::repeat("super".to_string()).take(current_mods.len() + 1));
            parts.push(self.resolver.batch().module_name(&target.file_id));
            parts.extend(target_mods);
        }
        parts.push(type_ident(last));
        parts.join("::")
    }

    /// Whether a singular field of message type `target` inside `container`
    /// makes the struct infinitely sized without a `Box`.
    fn needs_box(&self, target: &TypePath, target_message: &Message, container: &TypePath) -> bool {
        fn reaches(
            resolver: &Resolver<'_>,
            from: &TypePath,
            message: &Message,
            container: &TypePath,
            visited: &mut HashSet<TypePath>,
        ) -> bool {
            if from == container {
                return true;
            }
            if !visited.insert(from.clone()) {
                return false;
            }
            for field in message.all_fields() {
                if field.is_repeated {
                    continue;
                }
                if let Ok(ResolvedType::Message(path, next)) =
                    resolver.resolve(&field.type_, &from.file_id, &from.segments)
                {
                    if reaches(resolver, &path, next, container, visited) {
                        return true;
                    }
                }
            }
            false
        }

        reaches(&self.resolver, target, target_message, container, &mut HashSet::new())
    }

    /// Resolves a field and decides its Rust type and serde attributes.
    /// `in_oneof` members carry presence through their variant, so they are
    /// never wrapped in `Option`.
    fn field_shape(
        &self,
        field: &Field,
        scope: &[String],
        current_mods: &[String],
        in_oneof: bool,
    ) -> Result<FieldShape, ProtoError> {
        let resolved = self.resolver.resolve(&field.type_, self.file_id, scope)?;
        let container = TypePath {
            file_id:  self.file_id.to_string(),
            segments: scope.to_vec(),
        };

        let mut serde = vec![format!("rename = \"{}\"", to_json_name(&field.name))];
        if to_json_name(&field.name) != field.name {
            serde.push(format!("alias = \"{}\"", field.name));
        }

        let (base, json_module, boxed) = match &resolved {
            ResolvedType::Scalar(kind) => (kind.rust_type().to_string(), kind.json_module(), false),
            ResolvedType::Enum(path, _) => (self.render_path(path, current_mods), None, false),
            ResolvedType::Message(path, message) => {
                let boxed = !field.is_repeated && self.needs_box(path, message, &container);
                (self.render_path(path, current_mods), None, boxed)
            }
        };
        let is_message = matches!(resolved, ResolvedType::Message(..));

        let rust_type = if field.is_repeated {
            serde.push("skip_serializing_if = \"::std::vec::Vec::is_empty\"".to_string());
            if let Some(module) = json_module {
                serde.push(format!("with = \"::brine_proto::json::{}::repeated\"", module));
            }
            format!("::std::vec::Vec<{}>", base)
        } else if in_oneof {
            if let Some(module) = json_module {
                serde.push(format!("with = \"::brine_proto::json::{}\"", module));
            }
            if boxed {
                format!("::std::boxed::Box<{}>", base)
            } else {
                base
            }
        } else if is_message {
            if !field.is_optional {
                serde.push("skip_serializing_if = \"::core::option::Option::is_none\"".to_string());
            }
            if boxed {
                format!("::core::option::Option<::std::boxed::Box<{}>>", base)
            } else {
                format!("::core::option::Option<{}>", base)
            }
        } else if field.is_optional {
            if let Some(module) = json_module {
                serde.push(format!("with = \"::brine_proto::json::{}::option\"", module));
            }
            format!("::core::option::Option<{}>", base)
        } else {
            serde.push("skip_serializing_if = \"::brine_proto::is_default\"".to_string());
            if let Some(module) = json_module {
                serde.push(format!("with = \"::brine_proto::json::{}\"", module));
            }
            base
        };

        Ok(FieldShape { rust_type, serde })
    }

    fn emit_message(&mut self, message: &'a Message, parent: &[String]) -> Result<(), ProtoError> {
        let mut scope = parent.to_vec();
        scope.push(message.name.clone());
        let current_mods: Vec<String> = parent.iter().map(|s| module_ident(s)).collect();
        let struct_name = type_ident(&message.name);
        let nested_mod = module_ident(&message.name);

        self.code.line(format!("/// Message `{}`.", self.full_name(&scope)));
        self.code.line("#[derive(Debug, Clone, PartialEq, Default, ::serde::Serialize, ::serde::Deserialize)]");
        self.code.line("#[serde(default)]");
        self.code.open(format!("pub struct {} {{", struct_name));

        for field in &message.fields {
            let shape = self.field_shape(field, &scope, &current_mods, false)?;
            self.code.line(format!("/// `{}`", describe_field(field)));
            if field.is_deprecated {
                self.code.line("#[deprecated]");
            }
            self.code.line(format!("#[serde({})]", shape.serde.join(", ")));
            self.code.line(format!("pub {}: {},", field_ident(&field.name), shape.rust_type));
        }

        for oneof in &message.oneofs {
            let enum_path = format!("{}::{}", nested_mod, oneof_ident(message, oneof));
            self.code.line(format!("/// Oneof `{}`: at most one member is set.", oneof.name));
            self.code.line(format!(
                "#[serde(flatten, deserialize_with = \"{}::deserialize_flattened\")]",
                enum_path
            ));
            self.code.line(format!(
                "pub {}: ::core::option::Option<{}>,",
                field_ident(&oneof.name),
                enum_path
            ));
        }

        self.code.close("}");
        self.code.line("");

        if !message.oneofs.is_empty() {
            self.emit_oneof_accessors(message, &scope, &current_mods)?;
        }

        if !message.oneofs.is_empty() || !message.nested_messages.is_empty() || !message.nested_enums.is_empty() {
            let mut inner_mods = current_mods.clone();
            inner_mods.push(nested_mod.clone());

            self.code.line(format!("/// Nested types of `{}`.", self.full_name(&scope)));
            self.code.open(format!("pub mod {} {{", nested_mod));
            for oneof in &message.oneofs {
                self.emit_oneof(oneof, &oneof_ident(message, oneof), &scope, &inner_mods)?;
            }
            for nested in &message.nested_messages {
                self.emit_message(nested, &scope)?;
            }
            for nested in &message.nested_enums {
                self.emit_enum(nested, &scope);
            }
            self.code.close("}");
            self.code.line("");
        }

        Ok(())
    }

    /// Getters, setters, `clear_*` and `*_case` on the message owning the oneofs.
    fn emit_oneof_accessors(
        &mut self,
        message: &Message,
        scope: &[String],
        current_mods: &[String],
    ) -> Result<(), ProtoError> {
        let nested_mod = module_ident(&message.name);

        self.code.line("#[allow(deprecated)]");
        self.code.open(format!("impl {} {{", type_ident(&message.name)));

        let mut first = true;
        for oneof in &message.oneofs {
            let oneof_field = field_ident(&oneof.name);
            let oneof_snake = to_snake_case(&oneof.name);
            let enum_name = oneof_ident(message, oneof);
            let enum_path = format!("{}::{}", nested_mod, enum_name);
            let case_path = format!("{}::{}Case", nested_mod, enum_name);

            if !first {
                self.code.line("");
            }
            first = false;

            self.code.line(format!("/// Which member of `{}` is set, if any.", oneof.name));
            self.code.open(format!(
                "pub fn {}_case(&self) -> ::core::option::Option<{}> {{",
                oneof_snake, case_path
            ));
            self.code.line(format!("self.{}.as_ref().map(|value| value.case())", oneof_field));
            self.code.close("}");
            self.code.line("");
            self.code.open(format!("pub fn clear_{}(&mut self) {{", oneof_snake));
            self.code.line(format!("self.{} = ::core::option::Option::None;", oneof_field));
            self.code.close("}");

            for member in &oneof.fields {
                let shape = self.field_shape(member, scope, current_mods, true)?;
                let boxed = shape.rust_type.starts_with("::std::boxed::Box<");
                let value_type = if boxed {
                    shape.rust_type["::std::boxed::Box<".len()..shape.rust_type.len() - 1].to_string()
                } else {
                    shape.rust_type.clone()
                };
                let variant = type_ident(&member.name);
                let getter = field_ident(&member.name);
                let deprecated = if member.is_deprecated { "#[deprecated]" } else { "" };

                self.code.line("");
                self.code.line(format!("/// `{}`, if it is the member of `{}` that is set.", member.name, oneof.name));
                if !deprecated.is_empty() {
                    self.code.line(deprecated);
                }
                self.code.open(format!(
                    "pub fn {}(&self) -> ::core::option::Option<&{}> {{",
                    getter, value_type
                ));
                self.code.open(format!("match &self.{} {{", oneof_field));
                if boxed {
                    self.code.line(format!(
                        "::core::option::Option::Some({}::{}(value)) => ::core::option::Option::Some(&**value),",
                        enum_path, variant
                    ));
                } else {
                    self.code.line(format!(
                        "::core::option::Option::Some({}::{}(value)) => ::core::option::Option::Some(value),",
                        enum_path, variant
                    ));
                }
                self.code.line("_ => ::core::option::Option::None,");
                self.code.close("}");
                self.code.close("}");
                self.code.line("");
                self.code.line(format!("/// Sets `{}`, clearing any other member of `{}`.", member.name, oneof.name));
                if !deprecated.is_empty() {
                    self.code.line(deprecated);
                }
                self.code.open(format!("pub fn set_{}(&mut self, value: {}) {{", to_snake_case(&member.name), value_type));
                let wrapped = if boxed { "::std::boxed::Box::new(value)" } else { "value" };
                self.code.line(format!(
                    "self.{} = ::core::option::Option::Some({}::{}({}));",
                    oneof_field, enum_path, variant, wrapped
                ));
                self.code.close("}");
            }
        }

        self.code.close("}");
        self.code.line("");
        Ok(())
    }

    /// The oneof's payload enum and its `*Case` discriminant, inside the owner's module.
    fn emit_oneof(
        &mut self,
        oneof: &Oneof,
        enum_name: &str,
        scope: &[String],
        inner_mods: &[String],
    ) -> Result<(), ProtoError> {
        let case_name = format!("{}Case", enum_name);
        let mut member_keys: Vec<String> = Vec::new();

        self.code.line(format!("/// Members of oneof `{}`.", oneof.name));
        self.code.line("#[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]");
        self.code.open(format!("pub enum {} {{", enum_name));
        for member in &oneof.fields {
            let shape = self.field_shape(member, scope, inner_mods, true)?;
            let (rename, with): (Vec<&String>, Vec<&String>) = shape
                .serde
                .iter()
                .partition(|attr| attr.starts_with("rename") || attr.starts_with("alias"));
            member_keys.push(to_json_name(&member.name));
            if to_json_name(&member.name) != member.name {
                member_keys.push(member.name.clone());
            }
            self.code.line(format!("/// `{} {} = {}`", member.type_, member.name, member.number));
            if member.is_deprecated {
                self.code.line("#[deprecated]");
            }
            self.code.line(format!(
                "#[serde({})]",
                rename.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            ));
            if with.is_empty() {
                self.code.line(format!("{}({}),", type_ident(&member.name), shape.rust_type));
            } else {
                self.code.line(format!(
                    "{}(#[serde({})] {}),",
                    type_ident(&member.name),
                    with.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "),
                    shape.rust_type
                ));
            }
        }
        self.code.close("}");
        self.code.line("");

        self.code.line(format!("/// Which member of oneof `{}` is set.", oneof.name));
        self.code.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]");
        self.code.open(format!("pub enum {} {{", case_name));
        for member in &oneof.fields {
            self.code.line(format!("{},", type_ident(&member.name)));
        }
        self.code.close("}");
        self.code.line("");

        self.code.line("#[allow(deprecated)]");
        self.code.open(format!("impl {} {{", enum_name));
        self.code.open(format!("pub fn case(&self) -> {} {{", case_name));
        self.code.open("match self {");
        for member in &oneof.fields {
            let variant = type_ident(&member.name);
            self.code.line(format!("{}::{}(_) => {}::{},", enum_name, variant, case_name, variant));
        }
        self.code.close("}");
        self.code.close("}");
        self.code.line("");
        self.code.line("/// Field number of the member that is set.");
        self.code.open("pub fn number(&self) -> i32 {");
        self.code.open("match self {");
        for member in &oneof.fields {
            self.code.line(format!("{}::{}(_) => {},", enum_name, type_ident(&member.name), member.number));
        }
        self.code.close("}");
        self.code.close("}");
        self.code.line("");
        self.code.line("/// Reads the oneof from the owning message's remaining JSON keys.");
        self.code.line("/// A malformed member or a second member is an error.");
        self.code.open(
            "pub fn deserialize_flattened<'de, D: ::serde::Deserializer<'de>>(deserializer: D) -> ::core::result::Result<::core::option::Option<Self>, D::Error> {",
        );
        self.code.line(format!(
            "::brine_proto::json::oneof::deserialize(deserializer, \"{}\", &[{}])",
            oneof.name,
            member_keys.iter().map(|k| format!("\"{}\"", k)).collect::<Vec<_>>().join(", ")
        ));
        self.code.close("}");
        self.code.close("}");
        self.code.line("");
        Ok(())
    }

    fn emit_enum(&mut self, enum_: &Enum, parent: &[String]) {
        let mut scope = parent.to_vec();
        scope.push(enum_.name.clone());
        let name = type_ident(&enum_.name);
        let variants = enum_variant_names(enum_);

        self.code.line(format!("/// Enum `{}`.", self.full_name(&scope)));
        self.code.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]");
        self.code.line("#[repr(i32)]");
        self.code.open(format!("pub enum {} {{", name));
        for (value, variant) in enum_.values.iter().zip(&variants) {
            if value.number == 0 {
                self.code.line("#[default]");
            }
            if value.is_deprecated {
                self.code.line("#[deprecated]");
            }
            self.code.line(format!("{} = {},", variant, value.number));
        }
        self.code.close("}");
        self.code.line("");

        self.code.line("#[allow(deprecated)]");
        self.code.open(format!("impl {} {{", name));
        self.code.line("/// Every value, in declaration order.");
        self.code.line(format!(
            "pub const VALUES: &'static [{}] = &[{}];",
            name,
            variants
                .iter()
                .map(|v| format!("{}::{}", name, v))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        self.code.line("");
        self.code.line("/// The value's name in the schema, which is also its JSON form.");
        self.code.open("pub fn as_str_name(&self) -> &'static str {");
        self.code.open("match self {");
        for (value, variant) in enum_.values.iter().zip(&variants) {
            self.code.line(format!("{}::{} => \"{}\",", name, variant, value.name));
        }
        self.code.close("}");
        self.code.close("}");
        self.code.line("");
        self.code.open("pub fn from_str_name(name: &str) -> ::core::option::Option<Self> {");
        self.code.open("match name {");
        for (value, variant) in enum_.values.iter().zip(&variants) {
            self.code.line(format!(
                "\"{}\" => ::core::option::Option::Some({}::{}),",
                value.name, name, variant
            ));
        }
        self.code.line("_ => ::core::option::Option::None,");
        self.code.close("}");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");

        self.code.line("#[allow(deprecated)]");
        self.code.open(format!("impl ::brine_proto::ProtoEnum for {} {{", name));
        self.code.open("fn number(&self) -> i32 {");
        self.code.line("*self as i32");
        self.code.close("}");
        self.code.line("");
        self.code.open("fn from_number(number: i32) -> ::core::option::Option<Self> {");
        self.code.open("match number {");
        for (value, variant) in enum_.values.iter().zip(&variants) {
            self.code.line(format!(
                "{} => ::core::option::Option::Some({}::{}),",
                value.number, name, variant
            ));
        }
        self.code.line("_ => ::core::option::Option::None,");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");
        self.code.open("fn name(&self) -> &'static str {");
        self.code.line("self.as_str_name()");
        self.code.close("}");
        self.code.line("");
        self.code.open("fn from_name(name: &str) -> ::core::option::Option<Self> {");
        self.code.line("Self::from_str_name(name)");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");

        self.code.open(format!("impl ::core::convert::From<{}> for i32 {{", name));
        self.code.open(format!("fn from(value: {}) -> i32 {{", name));
        self.code.line("value as i32");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");

        self.code.open(format!("impl ::core::convert::TryFrom<i32> for {} {{", name));
        self.code.line("type Error = ::brine_proto::UnknownEnumValue;");
        self.code.line("");
        self.code.open("fn try_from(number: i32) -> ::core::result::Result<Self, Self::Error> {");
        self.code.line("<Self as ::brine_proto::ProtoEnum>::from_number(number).ok_or(::brine_proto::UnknownEnumValue(number))");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");

        self.code.open(format!("impl ::serde::Serialize for {} {{", name));
        self.code.open("fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error> {");
        self.code.line("::brine_proto::json::enumeration::serialize(self, serializer)");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");

        self.code.open(format!("impl<'de> ::serde::Deserialize<'de> for {} {{", name));
        self.code.open("fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> ::core::result::Result<Self, D::Error> {");
        self.code.line("::brine_proto::json::enumeration::deserialize(deserializer)");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");
    }

    fn emit_service(&mut self, service: &Service) -> Result<(), ProtoError> {
        let client = format!("{}Client", type_ident(&service.name));
        let full_name = self.full_name(&[service.name.clone()]);

        self.code.line(format!("/// Client for service `{}`.", full_name));
        self.code.line("#[derive(Debug, Clone)]");
        self.code.open(format!("pub struct {}<T> {{", client));
        self.code.line("transport: T,");
        self.code.close("}");
        self.code.line("");

        self.code.open(format!("impl<T> {}<T> {{", client));
        self.code.line(format!("pub const SERVICE_NAME: &'static str = \"{}\";", full_name));
        self.code.line("");
        self.code.open("pub fn new(transport: T) -> Self {");
        self.code.line("Self { transport }");
        self.code.close("}");
        self.code.line("");
        self.code.open("pub fn transport(&self) -> &T {");
        self.code.line("&self.transport");
        self.code.close("}");
        self.code.line("");
        self.code.open("pub fn into_inner(self) -> T {");
        self.code.line("self.transport");
        self.code.close("}");
        self.code.close("}");
        self.code.line("");

        if service.rpcs.is_empty() {
            return Ok(());
        }

        let mut methods: HashMap<String, &str> = HashMap::new();
        for rpc in &service.rpcs {
            if let Some(other) = methods.insert(rpc_ident(&rpc.name), &rpc.name) {
                return Err(ProtoError::VerifierError(format!(
                    "Service \"{}\": rpcs \"{}\" and \"{}\" map to the same method \"{}\"",
                    service.name,
                    other,
                    rpc.name,
                    rpc_ident(&rpc.name)
                )));
            }
        }

        self.code.open(format!("impl<T: ::brine_proto::Transport> {}<T> {{", client));
        for (i, rpc) in service.rpcs.iter().enumerate() {
            let scope = vec![service.name.clone(), rpc.name.clone()];
            let request = self.rpc_type(&rpc.request_type, &scope)?;
            let response = self.rpc_type(&rpc.response_type, &scope)?;
            if i > 0 {
                self.code.line("");
            }
            self.code.line(format!(
                "/// `rpc {}({}) returns ({})`",
                rpc.name, rpc.request_type, rpc.response_type
            ));
            self.code.open(format!(
                "pub fn {}(&self, request: &{}) -> ::core::result::Result<{}, T::Error> {{",
                rpc_ident(&rpc.name),
                request,
                response
            ));
            self.code.line(format!(
                "self.transport.call(Self::SERVICE_NAME, \"{}\", request)",
                rpc.name
            ));
            self.code.close("}");
        }
        self.code.close("}");
        self.code.line("");
        Ok(())
    }

    fn rpc_type(&self, type_ref: &str, scope: &[String]) -> Result<String, ProtoError> {
        Ok(match self.resolver.resolve(type_ref, self.file_id, scope)? {
            ResolvedType::Scalar(kind) => kind.rust_type().to_string(),
            ResolvedType::Enum(path, _) | ResolvedType::Message(path, _) => self.render_path(&path, &[]),
        })
    }
}

/// Source-like rendering of a field declaration for doc comments.
fn describe_field(field: &Field) -> String {
    let label = if field.is_repeated {
        "repeated "
    } else if field.is_optional {
        "optional "
    } else {
        ""
    };
    format!("{}{} {} = {}", label, field.type_, field.name, field.number)
}

/// Rust variant names for an enum's values. A shared `ENUM_NAME_` prefix is
/// dropped (`ACCESS_LEVEL_PRIVATE` in `AccessLevel` becomes `Private`) unless
/// that would make two variants collide.
fn enum_variant_names(enum_: &Enum) -> Vec<String> {
    let prefix = format!("{}_", to_snake_case(&enum_.name).to_uppercase());
    let stripped: Vec<String> = enum_
        .values
        .iter()
        .map(|value| match value.name.strip_prefix(&prefix) {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => type_ident(rest),
            _ => type_ident(&value.name),
        })
        .collect();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for name in &stripped {
        *seen.entry(name.as_str()).or_default() += 1;
    }
    if seen.values().all(|&count| count == 1) {
        stripped
    } else {
        enum_.values.iter().map(|value| type_ident(&value.name)).collect()
    }
}
