use crate::{
    tokenizer::Token,
    types::{Diagnostic, Enum, EnumValue, Field, Message, Oneof, Rpc, SchemaUnit, Service},
    utils::{error, quote},
    error::ProtoError,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:     Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref TYPE_NAME:      Regex = Regex::new(r"^\.?[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref PACKAGE_NAME:   Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref INTEGER:        Regex = Regex::new(r"^-?(?:0[xX][0-9A-Fa-f]+|\d+)$").unwrap();
    static ref STRING_LITERAL: Regex = Regex::new(r#"^(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')$"#).unwrap();
}

/// Builds a `SchemaUnit` from the output of `tokenize_schema`.
///
/// Statements that do not fit the grammar are skipped and recorded in
/// `SchemaUnit::diagnostics`. Running out of input inside a block is an error.
pub fn parse_schema(tokens: &[Token]) -> Result<SchemaUnit, ProtoError> {
    match tokens.last() {
        Some(last) if last.is_eof() => {}
        _ => return Err(ProtoError::InvalidInput("token stream must end with the end-of-input token".into())),
    }
    let mut parser = Parser {
        tokens,
        index: 0,
        diagnostics: Vec::new(),
    };
    parser.parse_unit()
}

struct Parser<'a> {
    tokens:      &'a [Token],
    index:       usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[(self.index + offset).min(tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.current();
        if !tok.is_eof() {
            self.index += 1;
        }
        tok
    }

    fn eat(&mut self, text: &str) -> bool {
        if !self.current().is_eof() && self.current().text == text {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<&'a Token, ProtoError> {
        let tok = self.current();
        if self.eat(text) {
            Ok(tok)
        } else {
            Err(self.expected(&quote(text)))
        }
    }

    fn expect_match(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, ProtoError> {
        let tok = self.current();
        if !tok.is_eof() && test.is_match(&tok.text) {
            self.index += 1;
            Ok(tok)
        } else {
            Err(self.expected(expected))
        }
    }

    fn expect_integer(&mut self, expected: &str) -> Result<i32, ProtoError> {
        let tok = self.expect_match(&INTEGER, expected)?;
        let (negative, digits) = match tok.text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, tok.text.as_str()),
        };
        let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => digits.parse::<i64>(),
        };
        magnitude
            .ok()
            .map(|m| if negative { -m } else { m })
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| error(&format!("Integer {} is out of range", quote(&tok.text)), tok.line, tok.column))
    }

    fn expected(&self, expected: &str) -> ProtoError {
        let tok = self.current();
        if tok.is_eof() {
            error(&format!("Expected {} but reached end of file", expected), tok.line, tok.column)
        } else {
            error(&format!("Expected {} but found {}", expected, quote(&tok.text)), tok.line, tok.column)
        }
    }

    fn unexpected_token(&self) -> ProtoError {
        let tok = self.current();
        if tok.is_eof() {
            error("Unexpected end of file", tok.line, tok.column)
        } else {
            error(&format!("Unexpected token {}", quote(&tok.text)), tok.line, tok.column)
        }
    }

    fn unsupported(&self, what: &str) -> ProtoError {
        let tok = self.current();
        error(&format!("{} are not supported", what), tok.line, tok.column)
    }

    /// Skips a `{ ... }` block, including nested blocks. The cursor must be on `{`.
    fn skip_block(&mut self) -> Result<(), ProtoError> {
        self.expect("{")?;
        let mut depth = 1;
        while depth > 0 {
            let tok = self.current();
            if tok.is_eof() {
                return Err(self.expected("\"}\""));
            }
            match tok.text.as_str() {
                "{" => depth += 1,
                "}" => depth -= 1,
                _ => {}
            }
            self.index += 1;
        }
        Ok(())
    }

    /// Skips to the end of the current statement: past the next `;`, or past a
    /// balanced block. Stops in front of a `}` that closes the enclosing block.
    fn skip_statement(&mut self) -> Result<(), ProtoError> {
        loop {
            let tok = self.current();
            if tok.is_eof() {
                return Ok(());
            }
            match tok.text.as_str() {
                "{" => return self.skip_block(),
                "}" => return Ok(()),
                ";" => {
                    self.index += 1;
                    return Ok(());
                }
                _ => self.index += 1,
            }
        }
    }

    /// Records a diagnostic for a statement that failed to parse and moves past it.
    /// Errors at end of input cannot be recovered from.
    fn recover(&mut self, start: usize, err: ProtoError) -> Result<(), ProtoError> {
        if self.current().is_eof() {
            return Err(err);
        }
        let (msg, line, column) = match err {
            ProtoError::ParseError { msg, line, column } => (msg, line, column),
            other => return Err(other),
        };
        tracing::debug!(line, column, "skipping statement: {}", msg);
        self.diagnostics.push(Diagnostic {
            message: msg,
            line,
            column,
        });
        self.index = start;
        self.skip_statement()?;
        if self.index == start {
            self.index += 1;
        }
        Ok(())
    }

    fn parse_unit(&mut self) -> Result<SchemaUnit, ProtoError> {
        let mut unit = SchemaUnit::default();

        while !self.current().is_eof() {
            let start = self.index;
            let result = match self.current().text.as_str() {
                "syntax" | "edition" => self.parse_syntax(&mut unit),
                "package" => self.parse_package(&mut unit),
                "import" => self.parse_import(&mut unit),
                "option" => self.parse_file_option(&mut unit),
                "message" => self.parse_message().map(|m| unit.messages.push(m)),
                "enum" => self.parse_enum().map(|e| unit.enums.push(e)),
                "service" => self.parse_service().map(|s| unit.services.push(s)),
                "extend" => Err(self.unsupported("Extend blocks")),
                ";" => {
                    self.index += 1;
                    Ok(())
                }
                _ => Err(self.unexpected_token()),
            };
            if let Err(err) = result {
                self.recover(start, err)?;
            }
        }

        unit.diagnostics = std::mem::take(&mut self.diagnostics);
        Ok(unit)
    }

    fn parse_syntax(&mut self, unit: &mut SchemaUnit) -> Result<(), ProtoError> {
        self.advance();
        self.expect("=")?;
        let value = self.expect_match(&STRING_LITERAL, "string literal")?;
        self.expect(";")?;
        unit.syntax = Some(unquote(&value.text));
        Ok(())
    }

    fn parse_package(&mut self, unit: &mut SchemaUnit) -> Result<(), ProtoError> {
        self.expect("package")?;
        let name = self.expect_match(&PACKAGE_NAME, "package name")?;
        self.expect(";")?;
        unit.package = name.text.clone();
        Ok(())
    }

    fn parse_import(&mut self, unit: &mut SchemaUnit) -> Result<(), ProtoError> {
        self.expect("import")?;
        if !self.eat("public") {
            self.eat("weak");
        }
        let path = self.expect_match(&STRING_LITERAL, "import path")?;
        self.expect(";")?;
        unit.imports.push(unquote(&path.text));
        Ok(())
    }

    fn parse_file_option(&mut self, unit: &mut SchemaUnit) -> Result<(), ProtoError> {
        let is_namespace = self.peek(1).text == "rust_module"
            && self.peek(2).text == "="
            && STRING_LITERAL.is_match(&self.peek(3).text)
            && self.peek(4).text == ";";
        if is_namespace {
            unit.namespace = Some(unquote(&self.peek(3).text));
            self.index += 5;
            Ok(())
        } else {
            self.skip_statement()
        }
    }

    fn parse_message(&mut self) -> Result<Message, ProtoError> {
        self.expect("message")?;
        let name = self.expect_match(&IDENTIFIER, "message name")?;
        self.expect("{")?;

        let mut message = Message {
            name:            name.text.clone(),
            line:            name.line,
            column:          name.column,
            fields:          Vec::new(),
            oneofs:          Vec::new(),
            nested_messages: Vec::new(),
            nested_enums:    Vec::new(),
        };

        while !self.eat("}") {
            if self.current().is_eof() {
                return Err(self.expected("\"}\""));
            }
            let start = self.index;
            let result = match self.current().text.as_str() {
                "message" => self.parse_message().map(|m| message.nested_messages.push(m)),
                "enum" => self.parse_enum().map(|e| message.nested_enums.push(e)),
                "oneof" => self.parse_oneof().map(|o| message.oneofs.push(o)),
                "option" | "reserved" => self.skip_statement(),
                "extensions" => Err(self.unsupported("Extension ranges")),
                "extend" => Err(self.unsupported("Extend blocks")),
                ";" => {
                    self.index += 1;
                    Ok(())
                }
                _ => self.parse_field(false).map(|f| message.fields.push(f)),
            };
            if let Err(err) = result {
                self.recover(start, err)?;
            }
        }

        Ok(message)
    }

    fn parse_oneof(&mut self) -> Result<Oneof, ProtoError> {
        self.expect("oneof")?;
        let name = self.expect_match(&IDENTIFIER, "oneof name")?;
        self.expect("{")?;

        let mut fields = Vec::new();
        while !self.eat("}") {
            if self.current().is_eof() {
                return Err(self.expected("\"}\""));
            }
            let start = self.index;
            let result = match self.current().text.as_str() {
                "option" => self.skip_statement(),
                ";" => {
                    self.index += 1;
                    Ok(())
                }
                _ => self.parse_field(true).map(|f| fields.push(f)),
            };
            if let Err(err) = result {
                self.recover(start, err)?;
            }
        }

        Ok(Oneof {
            name: name.text.clone(),
            fields,
        })
    }

    /// `[optional|repeated] <type> <name> = <number> [ <options> ] ;`
    fn parse_field(&mut self, in_oneof: bool) -> Result<Field, ProtoError> {
        // Oneof members always have explicit presence.
        let mut is_optional = in_oneof;
        let mut is_repeated = false;

        if self.current().text == "repeated" {
            if in_oneof {
                return Err(error(
                    "Repeated fields are not allowed in a oneof",
                    self.current().line,
                    self.current().column,
                ));
            }
            self.index += 1;
            is_repeated = true;
        } else if self.eat("optional") {
            is_optional = true;
        } else {
            self.eat("required");
        }

        if self.current().text == "map" && self.peek(1).text == "<" {
            return Err(self.unsupported("Map fields"));
        }
        if self.current().text == "group" {
            return Err(self.unsupported("Groups"));
        }

        let type_tok = self.expect_match(&TYPE_NAME, "field type")?;
        let name_tok = self.expect_match(&IDENTIFIER, "field name")?;
        self.expect("=")?;
        let number = self.expect_integer("field number")?;
        let is_deprecated = if self.current().text == "[" {
            self.parse_options()?
        } else {
            false
        };
        self.expect(";")?;

        Ok(Field {
            name:          name_tok.text.clone(),
            line:          name_tok.line,
            column:        name_tok.column,
            type_:         type_tok.text.clone(),
            number,
            is_optional,
            is_repeated,
            is_deprecated,
        })
    }

    /// Scans a bracketed option list. Only `deprecated` is modeled; returns
    /// whether it was set (anything but an explicit `false`).
    fn parse_options(&mut self) -> Result<bool, ProtoError> {
        self.expect("[")?;
        let mut deprecated = false;
        while !self.eat("]") {
            let tok = self.current();
            if tok.is_eof() {
                return Err(self.expected("\"]\""));
            }
            match tok.text.as_str() {
                "deprecated" => {
                    self.index += 1;
                    deprecated = if self.eat("=") {
                        self.advance().text != "false"
                    } else {
                        true
                    };
                }
                "{" => self.skip_block()?,
                ";" | "}" => return Err(self.expected("\"]\"")),
                _ => self.index += 1,
            }
        }
        Ok(deprecated)
    }

    fn parse_enum(&mut self) -> Result<Enum, ProtoError> {
        self.expect("enum")?;
        let name = self.expect_match(&IDENTIFIER, "enum name")?;
        self.expect("{")?;

        let mut values = Vec::new();
        while !self.eat("}") {
            if self.current().is_eof() {
                return Err(self.expected("\"}\""));
            }
            let start = self.index;
            let result = match self.current().text.as_str() {
                "option" | "reserved" => self.skip_statement(),
                ";" => {
                    self.index += 1;
                    Ok(())
                }
                _ => self.parse_enum_value().map(|v| values.push(v)),
            };
            if let Err(err) = result {
                self.recover(start, err)?;
            }
        }

        Ok(Enum {
            name:   name.text.clone(),
            line:   name.line,
            column: name.column,
            values,
        })
    }

    /// `<name> = <number> [ <options> ] ;`
    fn parse_enum_value(&mut self) -> Result<EnumValue, ProtoError> {
        let name = self.expect_match(&IDENTIFIER, "enum value name")?;
        self.expect("=")?;
        let number = self.expect_integer("enum value number")?;
        let is_deprecated = if self.current().text == "[" {
            self.parse_options()?
        } else {
            false
        };
        self.expect(";")?;
        Ok(EnumValue {
            name: name.text.clone(),
            number,
            is_deprecated,
        })
    }

    fn parse_service(&mut self) -> Result<Service, ProtoError> {
        self.expect("service")?;
        let name = self.expect_match(&IDENTIFIER, "service name")?;
        self.expect("{")?;

        let mut rpcs = Vec::new();
        while !self.eat("}") {
            if self.current().is_eof() {
                return Err(self.expected("\"}\""));
            }
            let start = self.index;
            let result = match self.current().text.as_str() {
                "option" => self.skip_statement(),
                ";" => {
                    self.index += 1;
                    Ok(())
                }
                "rpc" => self.parse_rpc().map(|r| rpcs.push(r)),
                _ => Err(self.unexpected_token()),
            };
            if let Err(err) = result {
                self.recover(start, err)?;
            }
        }

        Ok(Service {
            name: name.text.clone(),
            rpcs,
        })
    }

    /// `rpc <name> ( <request> ) returns ( <response> ) ( ; | { ... } )`
    fn parse_rpc(&mut self) -> Result<Rpc, ProtoError> {
        let rpc_tok = self.expect("rpc")?;
        let name = self.expect_match(&IDENTIFIER, "rpc name")?;
        self.expect("(")?;
        let mut streaming = self.eat("stream");
        let request = self.expect_match(&TYPE_NAME, "request type")?;
        self.expect(")")?;
        self.expect("returns")?;
        self.expect("(")?;
        streaming |= self.eat("stream");
        let response = self.expect_match(&TYPE_NAME, "response type")?;
        self.expect(")")?;
        if self.current().text == "{" {
            self.skip_block()?;
        } else {
            self.expect(";")?;
        }

        if streaming {
            return Err(error("Streaming rpcs are not supported", rpc_tok.line, rpc_tok.column));
        }

        Ok(Rpc {
            name:          name.text.clone(),
            request_type:  request.text.clone(),
            response_type: response.text.clone(),
        })
    }
}

/// Strips the quotes from a string literal token and resolves simple escapes.
fn unquote(literal: &str) -> String {
    if literal.len() < 2 {
        return String::new();
    }
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
