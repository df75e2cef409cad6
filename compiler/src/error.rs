use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Verifier error: {0}")]
    VerifierError(String),

    #[error("Unresolved type \"{type_ref}\" referenced from \"{referenced_from}\"")]
    UnresolvedType {
        type_ref:        String,
        referenced_from: String,
    },

    #[error("Ambiguous type \"{type_ref}\" referenced from \"{referenced_from}\": candidates are {}", candidates.join(", "))]
    AmbiguousType {
        type_ref:        String,
        referenced_from: String,
        candidates:      Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
