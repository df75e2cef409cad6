//! brine-proto-compiler
//!
//! This crate implements:
//!  1) A tokenizer + recursive-descent parser for `.proto` files, recovering from
//!     malformed statements with per-file diagnostics,
//!  2) A schema verifier (field numbers, enum zero values, duplicate names),
//!  3) `SchemaBatch`, the read-only set of every parsed file of a run,
//!  4) A resolver mapping type references to scalars, messages and enums anywhere in the batch,
//!  5) Rust code generation with serde JSON bindings (`generate_rust`),
//!  6) The two-phase driver used by the CLI and build scripts (`compile_dir`).

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod batch;
pub mod resolver;
pub mod gen_rust;
pub mod compiler;

pub use batch::SchemaBatch;
pub use compiler::{compile_batch, compile_dir, compile_schema, Event, Summary};
pub use error::ProtoError;
pub use gen_rust::{generate_rust, GeneratedUnit};
pub use resolver::{ResolvedType, Resolver, ScalarKind};
