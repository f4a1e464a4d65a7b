//! End-to-end compositions of the stages.
//!
//! Merge path: cleanse every table, fold them on the identity key, keep
//! eligible records, order them by first name and project onto the canonical
//! columns. Match path: filter and project an already merged report, then
//! link each record to the candidate pool.

use log::{info, warn};

use crate::{
    cleanse::{CleanseRules, cleanse},
    dataset::{Dataset, MergedDataset, Table},
    error::Result,
    filter::ThresholdFilter,
    fuzzy::{CandidatePool, FuzzyMatcher},
    merge::{IdentityKey, merge_tables},
    project::{project, project_merged},
};

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub key: IdentityKey,
    pub cleanse: CleanseRules,
    pub eligibility: Option<ThresholdFilter>,
    /// Field whose first token orders the output; `None` keeps merge order.
    pub sort_field: Option<String>,
    pub canonical: Vec<String>,
    pub missing_marker: String,
}

pub fn reconcile(tables: Vec<Table>, options: &MergeOptions) -> Result<MergedDataset> {
    if tables.is_empty() {
        warn!("No tables to reconcile");
    }
    let cleansed: Vec<Table> = tables
        .into_iter()
        .map(|table| {
            let before = table.len();
            let (table, report) = cleanse(table, &options.cleanse);
            info!(
                "Cleansed '{}': {} of {} row(s) kept ({} rank-token, {} repeated-header, {} positional)",
                table.label,
                table.len(),
                before,
                report.rank_token_rows,
                report.repeated_header_rows,
                report.positional_rows
            );
            table
        })
        .collect();

    let mut merged = merge_tables(cleansed, &options.key)?;
    if merged.schema().is_empty() {
        return Ok(merged);
    }

    if let Some(filter) = &options.eligibility {
        let before = merged.len();
        merged = merged.narrowed(filter.apply(merged.data())?);
        info!(
            "Kept {} of {} record(s) with {} > {}",
            merged.len(),
            before,
            filter.field,
            filter.threshold
        );
        if merged.is_empty() {
            warn!("No records passed the eligibility filter");
        }
    }

    if let Some(field) = &options.sort_field {
        merged = merged.sorted_by_first_name(field, &options.missing_marker);
    }

    let projected = project_merged(&merged, &options.canonical);
    info!(
        "Projected onto {} of {} canonical column(s)",
        projected.schema().len(),
        options.canonical.len()
    );
    Ok(projected)
}

#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub eligibility: Option<ThresholdFilter>,
    /// Columns to keep before matching; empty keeps every column.
    pub canonical: Vec<String>,
    pub matcher: FuzzyMatcher,
    pub value_field: String,
    pub score_field: String,
}

pub fn link_market_values(
    data: &Dataset,
    pool: &CandidatePool,
    options: &MatchOptions,
) -> Result<Dataset> {
    let mut targets = match &options.eligibility {
        Some(filter) => filter.apply(data)?,
        None => data.clone(),
    };
    info!("{} of {} record(s) eligible for matching", targets.len(), data.len());
    if !options.canonical.is_empty() {
        targets = project(&targets, &options.canonical);
    }
    if pool.is_empty() {
        warn!("Candidate pool is empty; no record can be matched");
    }
    let results = options.matcher.match_records(&targets, pool)?;
    options.matcher.attach(
        &targets,
        pool,
        &results,
        &options.value_field,
        &options.score_field,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, fuzzy::DEFAULT_SCORE_FIELD, fuzzy::DEFAULT_VALUE_FIELD};

    fn table(label: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            label,
            &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            "N/a",
        )
    }

    fn canonical(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn reconcile_runs_every_stage() {
        let standard = table(
            "Standard",
            &["Rk", "Player", "Squad", "Min", "Gls"],
            &[
                &["1", "Zed Zulu", "X", "900", "3"],
                &["Rk", "Player", "Squad", "Min", "Gls"],
                &["2", "Amy Adams", "Y", "45", "1"],
                &["3", "Bea Brown", "X", "1,200", "0"],
            ],
        );
        let shooting = table(
            "Shooting",
            &["Rk", "Player", "Squad", "Gls"],
            &[&["1", "Zed Zulu", "X", "4"], &["2", "Bea Brown", "X", "1"]],
        );
        let options = MergeOptions {
            key: IdentityKey::default(),
            cleanse: CleanseRules::default(),
            eligibility: Some(ThresholdFilter::new("Min", 90.0).unwrap()),
            sort_field: Some("Player".to_string()),
            canonical: canonical(&["Player", "Squad", "Min", "Gls", "Gls_Shooting", "xG"]),
            missing_marker: "N/a".to_string(),
        };
        let merged = reconcile(vec![standard, shooting], &options).unwrap();
        assert_eq!(
            merged.schema().names(),
            vec!["Player", "Squad", "Min", "Gls", "Gls_Shooting"]
        );
        let players: Vec<String> = merged
            .records()
            .iter()
            .map(|r| r.get(0).as_display("N/a"))
            .collect();
        assert_eq!(players, vec!["Bea Brown", "Zed Zulu"]);
        assert_eq!(merged.records()[1].get(4), &Value::Number(4.0));
        assert_eq!(merged.renames().len(), 2);
    }

    #[test]
    fn link_drops_rejected_records() {
        let report = table(
            "results",
            &["Player", "Squad", "Min"],
            &[
                &["De Bruyne Kevin", "Manchester City", "1500"],
                &["Unknown Player", "Nowhere", "1500"],
                &["Kylian Mbappe", "PSG", "300"],
            ],
        )
        .data;
        let pool = CandidatePool::from_pairs([
            ("Kevin De Bruyne", "$80m"),
            ("Kylian Mbappe", "$180m"),
        ]);
        let options = MatchOptions {
            eligibility: Some(ThresholdFilter::new("Min", 900.0).unwrap()),
            canonical: Vec::new(),
            matcher: FuzzyMatcher::new("Player", 80.0).unwrap(),
            value_field: DEFAULT_VALUE_FIELD.to_string(),
            score_field: DEFAULT_SCORE_FIELD.to_string(),
        };
        let linked = link_market_values(&report, &pool, &options).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked.value(&linked.records[0], "Transfer_Value"), &Value::text("$80m"));
        assert_eq!(linked.value(&linked.records[0], "Match_Score"), &Value::Number(100.0));
    }

    #[test]
    fn empty_table_list_is_an_empty_report() {
        let options = MergeOptions {
            key: IdentityKey::default(),
            cleanse: CleanseRules::default(),
            eligibility: Some(ThresholdFilter::new("Min", 90.0).unwrap()),
            sort_field: None,
            canonical: canonical(&["Player"]),
            missing_marker: "N/a".to_string(),
        };
        assert!(reconcile(Vec::new(), &options).unwrap().is_empty());
    }
}
