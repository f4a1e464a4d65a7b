//! Removal of scraped-artifact rows from a single raw table.
//!
//! Paginated statistics tables repeat their header block every few dozen
//! rows. Once flattened to CSV those blocks show up as data rows whose rank
//! cell holds the header token (`Rk`) or whose cells simply repeat the column
//! names. Every rule here inspects row content only, so the number and
//! placement of artifact rows does not matter.

use std::collections::HashSet;

use log::debug;

use crate::{
    data::Value,
    dataset::{Record, Table},
    schema::Schema,
};

pub const DEFAULT_RANK_COLUMN: &str = "Rk";

const HEADER_ALIAS_THRESHOLD_PERCENT: usize = 80;
const HEADER_ALIAS_MIN_MATCHES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanseRules {
    /// Rank/index column inspected for the header token.
    pub rank_column: String,
    /// Token marking a repeated header row; defaults to the rank column name.
    pub header_token: Option<String>,
    /// Drop rows whose cells repeat the table's own column names.
    pub repeated_headers: bool,
    /// Drop rows where any cell equals the row's 0-based position.
    pub positional_collisions: bool,
}

impl Default for CleanseRules {
    fn default() -> Self {
        Self {
            rank_column: DEFAULT_RANK_COLUMN.to_string(),
            header_token: None,
            repeated_headers: true,
            positional_collisions: false,
        }
    }
}

impl CleanseRules {
    pub fn header_token(&self) -> &str {
        self.header_token.as_deref().unwrap_or(&self.rank_column)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanseReport {
    pub rank_token_rows: usize,
    pub repeated_header_rows: usize,
    pub positional_rows: usize,
}

impl CleanseReport {
    pub fn removed(&self) -> usize {
        self.rank_token_rows + self.repeated_header_rows + self.positional_rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Artifact {
    RankToken,
    RepeatedHeader,
    Positional,
}

/// Returns `table` without artifact rows, plus a count per rule.
pub fn cleanse(table: Table, rules: &CleanseRules) -> (Table, CleanseReport) {
    let rank_index = table.schema().column_index(&rules.rank_column);
    if rank_index.is_none() {
        debug!(
            "Table '{}' has no '{}' column; rank-token rule skipped",
            table.label, rules.rank_column
        );
    }
    let header_aliases = if rules.repeated_headers {
        Some(header_alias_sets(table.schema()))
    } else {
        None
    };

    let mut report = CleanseReport::default();
    let Table { label, data } = table;
    let schema = data.schema;
    let mut kept = Vec::with_capacity(data.records.len());
    for (position, record) in data.records.into_iter().enumerate() {
        let verdict = classify(
            &record,
            position,
            rank_index,
            rules,
            header_aliases.as_deref(),
        );
        match verdict {
            Some(Artifact::RankToken) => report.rank_token_rows += 1,
            Some(Artifact::RepeatedHeader) => report.repeated_header_rows += 1,
            Some(Artifact::Positional) => report.positional_rows += 1,
            None => kept.push(record),
        }
    }
    (Table::new(label, schema, kept), report)
}

fn classify(
    record: &Record,
    position: usize,
    rank_index: Option<usize>,
    rules: &CleanseRules,
    header_aliases: Option<&[HashSet<String>]>,
) -> Option<Artifact> {
    if let Some(idx) = rank_index
        && record.get(idx).as_display("").trim() == rules.header_token()
    {
        return Some(Artifact::RankToken);
    }
    if let Some(aliases) = header_aliases
        && row_looks_like_header(record, aliases)
    {
        return Some(Artifact::RepeatedHeader);
    }
    if rules.positional_collisions {
        let label = position.to_string();
        let collides = record.values().iter().any(|value| match value {
            Value::Missing => false,
            other => other.as_display("").trim() == label,
        });
        if collides {
            return Some(Artifact::Positional);
        }
    }
    None
}

fn header_alias_sets(schema: &Schema) -> Vec<HashSet<String>> {
    schema
        .fields()
        .iter()
        .map(|field| {
            let mut aliases = HashSet::new();
            let trimmed = field.name.trim();
            aliases.insert(trimmed.to_ascii_lowercase());
            // `Gls.1` repeats as plain `Gls` in the embedded header block
            if let Some((base, suffix)) = trimmed.rsplit_once('.')
                && !base.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit())
            {
                aliases.insert(base.to_ascii_lowercase());
            }
            aliases
        })
        .collect()
}

fn row_looks_like_header(record: &Record, aliases: &[HashSet<String>]) -> bool {
    let mut alias_hits = 0usize;
    let mut non_empty = 0usize;
    for (idx, value) in record.values().iter().enumerate().take(aliases.len()) {
        let Value::Text(text) = value else {
            if !value.is_missing() {
                non_empty += 1;
            }
            continue;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        non_empty += 1;
        if aliases[idx].contains(&trimmed.to_ascii_lowercase()) {
            alias_hits += 1;
        }
    }
    non_empty >= HEADER_ALIAS_MIN_MATCHES
        && alias_hits >= HEADER_ALIAS_MIN_MATCHES
        && alias_hits * 100 >= non_empty * HEADER_ALIAS_THRESHOLD_PERCENT
}
