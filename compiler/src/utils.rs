use crate::error::ProtoError;

pub fn quote(text: &str) -> String {
    // Serializing a `&str` cannot fail.
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> ProtoError {
    ProtoError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Converts a string to PascalCase.
/// - If the string contains underscores, it splits on underscores and converts each word
///   so that its first letter is uppercase and the rest lowercase.
/// - If the string does not contain underscores and is fully uppercase, it converts it
///   so that only the first letter is uppercase and the rest are lowercase.
/// - Otherwise, it ensures only the first letter is uppercase.
pub fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(word, word == word.to_uppercase()))
            .collect::<String>()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case.
/// This implementation avoids inserting underscores between consecutive uppercase letters,
/// so that acronyms remain intact (e.g. "sessionID" becomes "session_id").
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if prev != '_'
                    && (!prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()))
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// The proto3 JSON name of a field: underscores are dropped and the letter
/// following each underscore is uppercased ("account_id" becomes "accountId").
pub fn to_json_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
pub fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl",
        "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while", "abstract", "become", "box", "do",
        "final", "macro", "override", "priv", "try", "typeof",
        "unsized", "virtual", "yield",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// Turns a file stem or `rust_module` option into a usable module identifier.
pub fn to_module_name(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let snake = to_snake_case(&cleaned);
    let ident = match snake.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", snake),
        Some(_) => snake,
        None => "_".to_string(),
    };
    escape_rust_keyword(&ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("ACCESS_LEVEL_PRIVATE"), "AccessLevelPrivate");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("headlessHost"), "HeadlessHost");
        assert_eq!(to_pascal_case("HeadlessHost"), "HeadlessHost");
        assert_eq!(to_pascal_case("start_world"), "StartWorld");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("HeadlessHost"), "headless_host");
        assert_eq!(to_snake_case("account_id"), "account_id");
        assert_eq!(to_snake_case("GetTokenByPassword"), "get_token_by_password");
        assert_eq!(to_snake_case("Foo_Bar"), "foo_bar");
    }

    #[test]
    fn test_json_name() {
        assert_eq!(to_json_name("account_id"), "accountId");
        assert_eq!(to_json_name("load_world_url"), "loadWorldUrl");
        assert_eq!(to_json_name("hosts"), "hosts");
        assert_eq!(to_json_name("sessionID"), "sessionID");
    }

    #[test]
    fn test_module_name() {
        assert_eq!(to_module_name("user"), "user");
        assert_eq!(to_module_name("headless-host"), "headless_host");
        assert_eq!(to_module_name("2fa"), "_2fa");
        assert_eq!(to_module_name("type"), "type_");
    }

    #[test]
    fn test_escape_keyword() {
        assert_eq!(escape_rust_keyword("type"), "type_");
        assert_eq!(escape_rust_keyword("name"), "name");
    }
}
