//! In-memory record sets: raw [`Table`]s, narrowed [`Dataset`]s and the
//! [`MergedDataset`] produced by the key merge.

use serde::Serialize;

use crate::{
    data::Value,
    schema::{Field, Schema},
};

static MISSING: Value = Value::Missing;

/// One row; values are aligned with the owning schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn missing(len: usize) -> Self {
        Self {
            values: vec![Value::Missing; len],
        }
    }

    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&MISSING)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set(&mut self, index: usize, value: Value) {
        if index >= self.values.len() {
            self.values.resize(index + 1, Value::Missing);
        }
        self.values[index] = value;
    }

    pub(crate) fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.extend(values);
    }

    pub(crate) fn select(&self, indices: &[usize]) -> Record {
        Record::new(indices.iter().map(|idx| self.get(*idx).clone()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of `field` in `record`, or missing when the field is unknown.
    pub fn value<'a>(&self, record: &'a Record, field: &str) -> &'a Value {
        match self.schema.column_index(field) {
            Some(idx) => record.get(idx),
            None => &MISSING,
        }
    }

    pub fn column(&self, field: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.column_index(field)?;
        Some(self.records.iter().map(|r| r.get(idx)).collect())
    }

    pub(crate) fn retain_where(&self, mut keep: impl FnMut(&Record) -> bool) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// A raw or cleansed source table, tagged with the label used for collision
/// suffixes.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub label: String,
    pub data: Dataset,
}

impl Table {
    pub fn new(label: impl Into<String>, schema: Schema, records: Vec<Record>) -> Self {
        Self {
            label: label.into(),
            data: Dataset::new(schema, records),
        }
    }

    /// Builds a table from header names and raw cell rows.
    pub fn from_rows(
        label: &str,
        headers: &[String],
        rows: Vec<Vec<String>>,
        missing_marker: &str,
    ) -> Self {
        let schema = Schema::from_headers(headers, label);
        let width = schema.len();
        let records = rows
            .into_iter()
            .map(|row| {
                let mut values: Vec<Value> = row
                    .iter()
                    .map(|cell| Value::from_raw(cell, missing_marker))
                    .collect();
                values.resize(width, Value::Missing);
                Record::new(values)
            })
            .collect();
        Self::new(label, schema, records)
    }

    pub fn schema(&self) -> &Schema {
        &self.data.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.data.records
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One collision suffix applied while folding tables together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameEntry {
    /// 1-based position of the incoming table in merge order.
    pub step: usize,
    pub source: String,
    pub original: String,
    pub renamed: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedDataset {
    data: Dataset,
    renames: Vec<RenameEntry>,
    sources: Vec<String>,
}

impl MergedDataset {
    pub(crate) fn from_parts(data: Dataset, renames: Vec<RenameEntry>, sources: Vec<String>) -> Self {
        Self {
            data,
            renames,
            sources,
        }
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn into_data(self) -> Dataset {
        self.data
    }

    pub fn schema(&self) -> &Schema {
        &self.data.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.data.records
    }

    pub fn renames(&self) -> &[RenameEntry] {
        &self.renames
    }

    /// Source labels in merge order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Field provenance for `name`, if present.
    pub fn provenance(&self, name: &str) -> Option<&Field> {
        let idx = self.data.schema.column_index(name)?;
        self.data.schema.field(idx)
    }

    /// Narrows the dataset while keeping the rename audit trail.
    pub fn narrowed(&self, data: Dataset) -> MergedDataset {
        MergedDataset {
            data,
            renames: self.renames.clone(),
            sources: self.sources.clone(),
        }
    }

    /// Stable reorder by the first whitespace-separated token of `name_field`.
    /// Missing names order as `missing_marker`. No field is added.
    pub fn sorted_by_first_name(&self, name_field: &str, missing_marker: &str) -> MergedDataset {
        let Some(idx) = self.data.schema.column_index(name_field) else {
            return self.clone();
        };
        let mut keyed: Vec<(String, &Record)> = self
            .data
            .records
            .iter()
            .map(|record| (first_token(record.get(idx), missing_marker), record))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let records = keyed.into_iter().map(|(_, r)| r.clone()).collect();
        self.narrowed(Dataset::new(self.data.schema.clone(), records))
    }
}

fn first_token(value: &Value, missing_marker: &str) -> String {
    match value {
        Value::Missing => missing_marker.to_string(),
        other => other
            .as_display(missing_marker)
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn from_rows_pads_short_rows_with_missing() {
        let table = Table::from_rows(
            "Standard",
            &strings(&["Player", "Squad", "Min"]),
            vec![strings(&["Alice Smith", "X"])],
            "N/a",
        );
        assert_eq!(table.records()[0].get(2), &Value::Missing);
        assert_eq!(table.schema().field(0).unwrap().origin.source, "Standard");
    }

    #[test]
    fn sorted_by_first_name_is_stable() {
        let table = Table::from_rows(
            "Standard",
            &strings(&["Player", "Squad"]),
            vec![
                strings(&["Mohamed Salah", "Liverpool"]),
                strings(&["Bukayo Saka", "Arsenal"]),
                strings(&["Mohamed Elneny", "Arsenal"]),
                strings(&["", "Chelsea"]),
            ],
            "N/a",
        );
        let merged = MergedDataset::from_parts(table.data, Vec::new(), vec!["Standard".into()]);
        let sorted = merged.sorted_by_first_name("Player", "N/a");
        let names: Vec<String> = sorted
            .records()
            .iter()
            .map(|r| r.get(0).as_display("N/a"))
            .collect();
        assert_eq!(
            names,
            vec!["Bukayo Saka", "Mohamed Salah", "Mohamed Elneny", "N/a"]
        );
    }
}
