use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::{
    batch::SchemaBatch,
    error::ProtoError,
    gen_rust::{generate_rust, GeneratedUnit},
    parser::parse_schema,
    tokenizer::tokenize_schema,
    types::{Diagnostic, SchemaUnit},
    verifier::verify_schema,
};

/// Compile the text of one `.proto` file into a `SchemaUnit`.
/// Returns `Err(ProtoError)` if tokenization, a fatal parse error or verification fails;
/// recoverable parse errors are kept in `SchemaUnit::diagnostics`.
pub fn compile_schema(text: &str) -> Result<SchemaUnit, ProtoError> {
    let tokens = tokenize_schema(text)?;
    let unit = parse_schema(&tokens)?;
    verify_schema(&unit)?;
    Ok(unit)
}

/// Runs the emitter over every file of a complete batch, in file id order.
/// `Ok(None)` marks a file skipped for having no messages and no enums.
pub fn compile_batch(batch: &SchemaBatch) -> Vec<(String, Result<Option<GeneratedUnit>, ProtoError>)> {
    batch
        .file_ids()
        .map(|file_id| (file_id.to_string(), generate_rust(file_id, batch)))
        .collect()
}

/// Progress of [`compile_dir`], reported as each step completes.
#[derive(Debug)]
pub enum Event<'e> {
    Found {
        count: usize,
    },
    Parsed {
        file_id:     &'e str,
        messages:    usize,
        enums:       usize,
        diagnostics: &'e [Diagnostic],
    },
    ParseFailed {
        file_id: &'e str,
        error:   &'e ProtoError,
    },
    Skipped {
        file_id: &'e str,
    },
    Generated {
        file_id: &'e str,
        path:    &'e Path,
    },
    Failed {
        file_id: &'e str,
        error:   &'e ProtoError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub found:          usize,
    pub parsed:         usize,
    pub parse_failures: usize,
    pub skipped:        usize,
    pub generated:      usize,
    /// Files whose emission failed, e.g. on an unresolved type.
    pub failures:       usize,
    /// Input files that could not be read or outputs that could not be written.
    pub io_failures:    usize,
}

impl Summary {
    pub fn is_clean(&self) -> bool {
        self.parse_failures == 0 && self.failures == 0 && self.io_failures == 0
    }
}

/// Input-relative path with `/` separators.
fn file_id_for(input: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(input).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every `.proto` file below `input`, sorted by path.
fn discover(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "proto"))
        .collect();
    files.sort();
    files
}

/// Writes `code` to `path` through a temporary file in the same directory,
/// so `path` is either left untouched or replaced whole.
fn write_atomic(dir: &Path, path: &Path, code: &str) -> Result<(), ProtoError> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|err| ProtoError::Io(err.error))?;
    Ok(())
}

/// Compiles every `.proto` file under `input` into `<stem>.g.rs` files in `output`.
///
/// All files are parsed before any code is generated, since a type may be
/// declared in a different file than the one referencing it. Per-file failures
/// are reported through `on_event` and counted in the returned `Summary`; the
/// call itself fails only when `input` is not a directory or `output` cannot
/// be created.
pub fn compile_dir(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mut on_event: impl FnMut(&Event<'_>),
) -> Result<Summary, ProtoError> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.is_dir() {
        return Err(ProtoError::InvalidInput(format!(
            "Input directory does not exist: {}",
            input.display()
        )));
    }
    fs::create_dir_all(output)?;

    let mut summary = Summary::default();
    let files = discover(input);
    summary.found = files.len();
    on_event(&Event::Found { count: files.len() });

    debug!(count = files.len(), "parsing proto files");
    let mut units: Vec<(String, SchemaUnit)> = Vec::with_capacity(files.len());
    for path in &files {
        let file_id = file_id_for(input, path);
        let parsed = fs::read_to_string(path)
            .map_err(ProtoError::from)
            .and_then(|text| compile_schema(&text));
        match parsed {
            Ok(unit) => {
                for diagnostic in &unit.diagnostics {
                    warn!(file = %file_id, %diagnostic, "skipped malformed statement");
                }
                summary.parsed += 1;
                on_event(&Event::Parsed {
                    file_id:     &file_id,
                    messages:    unit.messages.len(),
                    enums:       unit.enums.len(),
                    diagnostics: &unit.diagnostics,
                });
                units.push((file_id, unit));
            }
            Err(err) => {
                error!(file = %file_id, %err, "failed to parse");
                if matches!(err, ProtoError::Io(_)) {
                    summary.io_failures += 1;
                } else {
                    summary.parse_failures += 1;
                }
                on_event(&Event::ParseFailed {
                    file_id: &file_id,
                    error:   &err,
                });
            }
        }
    }

    let batch: SchemaBatch = units.into_iter().collect();
    debug!(files = batch.len(), "generating rust code");

    let mut written: HashMap<String, String> = HashMap::new();
    let mut modules: HashMap<String, String> = HashMap::new();
    for (file_id, result) in compile_batch(&batch) {
        let generated = match result {
            Ok(Some(generated)) => generated,
            Ok(None) => {
                debug!(file = %file_id, "no messages or enums");
                summary.skipped += 1;
                on_event(&Event::Skipped { file_id: &file_id });
                continue;
            }
            Err(err) => {
                error!(file = %file_id, %err, "failed to generate");
                summary.failures += 1;
                on_event(&Event::Failed {
                    file_id: &file_id,
                    error:   &err,
                });
                continue;
            }
        };

        let collision = written
            .get(&generated.file_name)
            .map(|other| format!("output file {} is already generated from {}", generated.file_name, other))
            .or_else(|| {
                modules
                    .get(&generated.module_name)
                    .map(|other| format!("module name {} is already used by {}", generated.module_name, other))
            });
        if let Some(reason) = collision {
            let err = ProtoError::InvalidInput(reason);
            error!(file = %file_id, %err, "output collision");
            summary.failures += 1;
            on_event(&Event::Failed {
                file_id: &file_id,
                error:   &err,
            });
            continue;
        }

        let path = output.join(&generated.file_name);
        match write_atomic(output, &path, &generated.code) {
            Ok(()) => {
                written.insert(generated.file_name.clone(), file_id.clone());
                modules.insert(generated.module_name.clone(), file_id.clone());
                summary.generated += 1;
                on_event(&Event::Generated {
                    file_id: &file_id,
                    path:    &path,
                });
            }
            Err(err) => {
                error!(file = %file_id, path = %path.display(), %err, "failed to write");
                summary.io_failures += 1;
                on_event(&Event::Failed {
                    file_id: &file_id,
                    error:   &err,
                });
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_schema_runs_verifier() {
        let err = compile_schema("message M { int32 a = 1; int32 b = 1; }").unwrap_err();
        assert!(matches!(err, ProtoError::VerifierError(_)), "{:?}", err);
    }

    #[test]
    fn test_compile_schema_keeps_diagnostics() {
        let unit = compile_schema("message M { int32 = 1; string name = 2; }").unwrap();
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(unit.messages[0].fields.len(), 1);
        assert_eq!(unit.messages[0].fields[0].name, "name");
    }

    #[test]
    fn test_file_id_uses_forward_slashes() {
        let input = Path::new("protos");
        let path = input.join("hdlctrl").join("v1").join("user.proto");
        assert_eq!(file_id_for(input, &path), "hdlctrl/v1/user.proto");
    }

    #[test]
    fn test_compile_batch_reports_every_file() {
        let batch: SchemaBatch = vec![
            ("a.proto".to_string(), compile_schema("message A { B b = 1; }").unwrap()),
            ("b.proto".to_string(), compile_schema("message B {}").unwrap()),
            ("c.proto".to_string(), compile_schema("service C {}").unwrap()),
        ]
        .into_iter()
        .collect();
        let results = compile_batch(&batch);
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a.proto", "b.proto", "c.proto"]);
        assert!(matches!(results[0].1, Ok(Some(_))));
        assert!(matches!(results[2].1, Ok(None)));
    }
}
