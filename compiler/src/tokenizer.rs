use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::ProtoError;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(/\*[\s\S]*?\*/|//[^\n]*",
        r#"|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#,
        r"|-?(?:0[xX][0-9A-Fa-f]+|\d+(?:\.\d*)?(?:[eE][+-]?\d+)?)",
        r"|\.?[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*",
        r"|[=;{}()\[\],<>:+-]|\s+)",
    )).unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^(//.*|/\*[\s\S]*|\s+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.text.is_empty()
    }
}

fn syntax_error(unexpected: &str, line: usize, column: usize) -> ProtoError {
    let msg = if unexpected.starts_with("/*") {
        "Unterminated block comment".to_string()
    } else if unexpected.starts_with('"') || unexpected.starts_with('\'') {
        "Unterminated string literal".to_string()
    } else {
        let snippet: String = unexpected.chars().take(20).collect();
        format!("Syntax error: {}", quote(&snippet))
    };
    error(&msg, line, column)
}

/// Splits `.proto` text into tokens, dropping whitespace and comments.
/// The last token is always the empty end-of-input token.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, ProtoError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end   = mat.end();
        let part  = mat.as_str();

        if start > last_end {
            return Err(syntax_error(&text[last_end..], line, column));
        }

        if !WHITESPACE_RX.is_match(part) {
            tokens.push(Token {
                text: part.to_string(),
                line,
                column,
            });
        }

        // Update line/column
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = end;
    }

    if last_end != text.len() {
        return Err(syntax_error(&text[last_end..], line, column));
    }

    tokens.push(Token {
        text: String::new(),
        line,
        column,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize_schema(input)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let input = "int32 x = 10;";
        let expected = vec![
            Token { text: "int32".into(), line: 1, column: 1 },
            Token { text: "x".into(),     line: 1, column: 7 },
            Token { text: "=".into(),     line: 1, column: 9 },
            Token { text: "10".into(),    line: 1, column: 11 },
            Token { text: ";".into(),     line: 1, column: 13 },
            Token { text: "".into(),      line: 1, column: 14 },
        ];
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_tokenize_tracks_lines() {
        let input = "message A {\n  string s = 1;\n}";
        let got = tokenize_schema(input).unwrap();
        let s = got.iter().find(|t| t.text == "string").unwrap();
        assert_eq!((s.line, s.column), (2, 3));
        let close = got.iter().find(|t| t.text == "}").unwrap();
        assert_eq!((close.line, close.column), (3, 1));
    }

    #[test]
    fn test_tokenize_drops_comments() {
        let input = "// leading\nmessage /* inline */ A { /* multi\nline */ }";
        assert_eq!(texts(input), vec!["message", "A", "{", "}", ""]);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let input = r#"option rust_module = "http://x/*y*/";"#;
        assert_eq!(
            texts(input),
            vec!["option", "rust_module", "=", r#""http://x/*y*/""#, ";", ""]
        );
    }

    #[test]
    fn test_tokenize_dotted_names_and_options() {
        let input = "repeated .google.protobuf.Timestamp at = 3 [deprecated = true];";
        assert_eq!(
            texts(input),
            vec![
                "repeated", ".google.protobuf.Timestamp", "at", "=", "3",
                "[", "deprecated", "=", "true", "]", ";", "",
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(texts("-1 0x1F 2.5"), vec!["-1", "0x1F", "2.5", ""]);
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let input = "int32 x = 10 @";
        let err = tokenize_schema(input).unwrap_err();
        assert!(
            matches!(err, ProtoError::ParseError { line: 1, column: 14, .. }),
            "expected a ParseError but got {:?}",
            err
        );
    }

    #[test]
    fn test_tokenize_unterminated_comment() {
        let err = tokenize_schema("message A { /* never closed").unwrap_err();
        assert!(err.to_string().contains("Unterminated block comment"), "{}", err);
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        let err = tokenize_schema("import \"a.proto;\n").unwrap_err();
        assert!(err.to_string().contains("Unterminated string literal"), "{}", err);
    }
}
