//! Explicit column model for tables and merged datasets.
//!
//! A [`Schema`] is an ordered list of uniquely named [`Field`]s. Each field
//! remembers which source table it came from and, when the merge had to
//! disambiguate it, the name it carried in that table. Projection and rename
//! go through this type instead of ad hoc string manipulation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result, Stage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOrigin {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub origin: FieldOrigin,
}

impl Field {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: FieldOrigin {
                source: source.into(),
                renamed_from: None,
            },
        }
    }

    /// Copy of this field carrying `renamed` as its name while recording the
    /// original.
    pub fn renamed(&self, renamed: String) -> Self {
        Self {
            name: renamed,
            origin: FieldOrigin {
                source: self.origin.source.clone(),
                renamed_from: Some(self.name.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    positions: HashMap<String, usize>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        let positions = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();
        Self { fields, positions }
    }

    /// Builds a schema for headers read from one source. Repeated header
    /// names are made unique the way HTML table readers do it: the second
    /// `Gls` becomes `Gls.1`, the third `Gls.2`.
    pub fn from_headers(headers: &[String], source: &str) -> Self {
        let names = dedupe_headers(headers);
        Self::new(
            names
                .into_iter()
                .map(|name| Field::new(name, source))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Resolves `name` or fails with a stage-tagged
    /// [`ReconcileError::MissingRequiredField`].
    pub fn require(&self, name: &str, stage: Stage, source_label: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReconcileError::missing_field(stage, name, source_label))
    }

    /// Indices of `requested` that exist in this schema, in requested order.
    /// Unknown and repeated names are skipped.
    pub fn project_indices(&self, requested: &[String]) -> Vec<usize> {
        let mut seen = HashSet::new();
        requested
            .iter()
            .filter_map(|name| self.column_index(name))
            .filter(|idx| seen.insert(*idx))
            .collect()
    }

    pub fn select(&self, indices: &[usize]) -> Schema {
        Schema::new(
            indices
                .iter()
                .filter_map(|idx| self.fields.get(*idx).cloned())
                .collect(),
        )
    }

    /// Appends `field`, failing if the name is already taken.
    pub(crate) fn push(&mut self, field: Field) -> std::result::Result<(), Field> {
        if self.positions.contains_key(&field.name) {
            return Err(field);
        }
        self.positions.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }
}

fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut names = Vec::with_capacity(headers.len());
    for header in headers {
        let base = header.trim();
        let count = occurrences.entry(base).or_insert(0);
        let mut candidate = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}.{count}")
        };
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}.{count}");
        }
        *count += 1;
        taken.insert(candidate.clone());
        names.push(candidate);
    }
    names
}
