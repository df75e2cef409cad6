use std::collections::BTreeMap;

use crate::{types::SchemaUnit, utils::to_module_name};

/// Every parsed file of one run, keyed by file id (the input-relative path
/// with `/` separators). Built once after all files are parsed; read-only after.
#[derive(Debug, Clone, Default)]
pub struct SchemaBatch {
    units: BTreeMap<String, SchemaUnit>,
}

impl SchemaBatch {
    pub fn get(&self, file_id: &str) -> Option<&SchemaUnit> {
        self.units.get(file_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaUnit)> {
        self.units.iter().map(|(id, unit)| (id.as_str(), unit))
    }

    pub fn file_ids(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Name of the module that holds a file's generated code: its
    /// `rust_module` option, or else its file stem.
    pub fn module_name(&self, file_id: &str) -> String {
        match self.get(file_id).and_then(|unit| unit.namespace.as_deref()) {
            Some(namespace) => to_module_name(namespace),
            None => to_module_name(file_stem(file_id)),
        }
    }
}

impl FromIterator<(String, SchemaUnit)> for SchemaBatch {
    fn from_iter<I: IntoIterator<Item = (String, SchemaUnit)>>(iter: I) -> Self {
        SchemaBatch {
            units: iter.into_iter().collect(),
        }
    }
}

/// `"hdlctrl/v1/user.proto"` → `"user"`.
pub fn file_stem(file_id: &str) -> &str {
    let base = file_id.rsplit('/').next().unwrap_or(file_id);
    match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    }
}
