//! Order-sensitive full outer join of several tables on the identity key.
//!
//! The merge is a fold: the first table seeds the accumulator and keeps every
//! field name as-is. Each later table is joined against the accumulator; a
//! non-key field both sides define is renamed on the incoming side to
//! `<field>_<label>`. Whoever comes first in merge order therefore owns the
//! bare name. Every rename is recorded in the returned [`MergedDataset`].
//!
//! Keys that repeat on either side fan out to the Cartesian product of the
//! matching rows, as any relational join would. Deduplicate upstream if that
//! is not wanted.
//!
//! Rows come out in accumulator order, each followed by its matches in
//! incoming order; incoming rows without a partner are appended last. Keys
//! are never sorted, so the unsorted merge order differs from a join that
//! orders its output by key.

use std::collections::HashMap;

use log::{debug, info};

use crate::{
    data::Value,
    dataset::{Dataset, MergedDataset, Record, RenameEntry, Table},
    error::{ReconcileError, Result, Stage},
    schema::Schema,
};

const KEY_SEPARATOR: &str = "\u{1f}";

/// Field names that jointly identify a player across tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub fields: Vec<String>,
}

impl IdentityKey {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma separated key list such as `Player,Squad`.
    pub fn parse(value: &str) -> Result<Self> {
        let fields = value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        if fields.is_empty() {
            return Err(ReconcileError::EmptyKey(value.to_string()));
        }
        Ok(Self { fields })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    fn indices(&self, schema: &Schema, label: &str) -> Result<Vec<usize>> {
        self.fields
            .iter()
            .map(|name| schema.require(name, Stage::Merge, label))
            .collect()
    }
}

impl Default for IdentityKey {
    fn default() -> Self {
        Self::new(["Player", "Squad"])
    }
}

/// Folds `tables` in order into one [`MergedDataset`]. An empty list yields
/// an empty dataset.
pub fn merge_tables(tables: Vec<Table>, key: &IdentityKey) -> Result<MergedDataset> {
    let mut tables = tables.into_iter();
    let Some(first) = tables.next() else {
        return Ok(MergedDataset::default());
    };
    key.indices(first.schema(), &first.label)?;
    let seed = MergedDataset::from_parts(first.data, Vec::new(), vec![first.label]);
    tables
        .enumerate()
        .try_fold(seed, |acc, (idx, table)| merge_step(acc, table, key, idx + 1))
}

/// Joins one incoming table onto the accumulator.
pub fn merge_step(
    acc: MergedDataset,
    incoming: Table,
    key: &IdentityKey,
    step: usize,
) -> Result<MergedDataset> {
    let acc_label = acc.sources().join("+");
    let acc_keys = key.indices(acc.schema(), &acc_label)?;
    let in_keys = key.indices(incoming.schema(), &incoming.label)?;

    let (schema, incoming_columns, new_renames) = build_schema(acc.schema(), &incoming, key, step)?;
    for entry in &new_renames {
        debug!(
            "Step {step}: '{}' from '{}' renamed to '{}'",
            entry.original, entry.source, entry.renamed
        );
    }

    let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_idx, record) in incoming.records().iter().enumerate() {
        lookup
            .entry(build_key(record, &in_keys))
            .or_default()
            .push(row_idx);
    }

    let mut matched = vec![false; incoming.len()];
    let mut records = Vec::with_capacity(acc.len().max(incoming.len()));
    let mut matched_rows = 0usize;
    for record in acc.records() {
        match lookup.get(&build_key(record, &acc_keys)) {
            Some(bucket) => {
                for &row_idx in bucket {
                    matched[row_idx] = true;
                    matched_rows += 1;
                    let mut combined = record.clone();
                    combined.extend(
                        incoming_columns
                            .iter()
                            .map(|idx| incoming.records()[row_idx].get(*idx).clone()),
                    );
                    records.push(combined);
                }
            }
            None => {
                let mut combined = record.clone();
                combined.extend(incoming_columns.iter().map(|_| Value::Missing));
                records.push(combined);
            }
        }
    }

    let acc_width = acc.schema().len();
    for (row_idx, record) in incoming.records().iter().enumerate() {
        if matched[row_idx] {
            continue;
        }
        let mut combined = Record::missing(acc_width);
        for (acc_idx, in_idx) in acc_keys.iter().zip(in_keys.iter()) {
            combined.set(*acc_idx, record.get(*in_idx).clone());
        }
        combined.extend(incoming_columns.iter().map(|idx| record.get(*idx).clone()));
        records.push(combined);
    }

    info!(
        "Merged '{}' (step {}): {} row(s) x {} column(s), {} matched pair(s)",
        incoming.label,
        step,
        records.len(),
        schema.len(),
        matched_rows
    );

    let mut renames = acc.renames().to_vec();
    renames.extend(new_renames);
    let mut sources = acc.sources().to_vec();
    sources.push(incoming.label.clone());
    Ok(MergedDataset::from_parts(
        Dataset::new(schema, records),
        renames,
        sources,
    ))
}

/// Output schema of one step: accumulator fields, then the incoming non-key
/// fields with collision suffixes applied.
fn build_schema(
    acc: &Schema,
    incoming: &Table,
    key: &IdentityKey,
    step: usize,
) -> Result<(Schema, Vec<usize>, Vec<RenameEntry>)> {
    let mut schema = acc.clone();
    let mut columns = Vec::new();
    let mut renames = Vec::new();
    for (idx, field) in incoming.schema().fields().iter().enumerate() {
        if key.contains(&field.name) {
            continue;
        }
        let placed = if acc.contains(&field.name) {
            let renamed = format!("{}_{}", field.name, incoming.label);
            renames.push(RenameEntry {
                step,
                source: incoming.label.clone(),
                original: field.name.clone(),
                renamed: renamed.clone(),
            });
            field.renamed(renamed)
        } else {
            field.clone()
        };
        schema
            .push(placed)
            .map_err(|field| ReconcileError::SuffixCollision {
                stage: Stage::Merge,
                field: field.name,
                source_label: incoming.label.clone(),
            })?;
        columns.push(idx);
    }
    Ok((schema, columns, renames))
}

fn build_key(record: &Record, indices: &[usize]) -> String {
    indices
        .iter()
        .map(|idx| record.get(*idx).key_part())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}
