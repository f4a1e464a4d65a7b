//! League and per-squad descriptive statistics over a reconciled report.
//!
//! A column counts as numeric when it holds at least one value and every
//! present value is a number. Gaps in numeric columns are imputed with the
//! league-wide column mean before anything is computed, so the imputed
//! dataset is also what the top/bottom rankings see.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    data::{Value, format_number},
    dataset::{Dataset, Record},
    error::{Result, Stage},
    schema::{Field, Schema},
    table::{Align, render_table},
};

/// Row label of the league-wide group.
pub const ALL_GROUP: &str = "all";

/// Indices of numeric columns, skipping any named in `exclude`.
pub fn numeric_columns(data: &Dataset, exclude: &[String]) -> Vec<usize> {
    data.schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| !exclude.contains(&field.name))
        .filter(|(idx, _)| {
            let mut present = data
                .records
                .iter()
                .map(|r| r.get(*idx))
                .filter(|v| !v.is_missing())
                .peekable();
            present.peek().is_some() && present.all(|v| matches!(v, Value::Number(_)))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Replaces Missing cells of `columns` with the column mean.
pub fn impute_means(data: &Dataset, columns: &[usize]) -> Dataset {
    let means: Vec<(usize, f64)> = columns
        .iter()
        .filter_map(|&idx| {
            let values = column_values(&data.records, idx);
            ColumnStats::from_values(values).mean().map(|mean| (idx, mean))
        })
        .collect();
    let mut records = data.records.clone();
    let mut filled = 0usize;
    for record in &mut records {
        for &(idx, mean) in &means {
            if record.get(idx).is_missing() {
                record.set(idx, Value::Number(mean));
                filled += 1;
            }
        }
    }
    if filled > 0 {
        debug!("Imputed {filled} missing numeric cell(s) with column means");
    }
    Dataset::new(data.schema.clone(), records)
}

fn column_values<'a>(records: impl IntoIterator<Item = &'a Record>, idx: usize) -> Vec<f64> {
    records
        .into_iter()
        .filter_map(|r| r.get(idx).as_number())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStats {
    values: Vec<f64>,
    sum: f64,
}

impl ColumnStats {
    pub fn from_values(values: Vec<f64>) -> Self {
        let sum = values.iter().sum();
        Self { values, sum }
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f64)
        }
    }

    pub fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sorted: Vec<f64> = self.values.iter().copied().sorted_by(f64::total_cmp).collect();
        let mid = sorted.len() / 2;
        if sorted.len().is_multiple_of(2) {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Sample standard deviation (n - 1); undefined below two values.
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let squares: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((squares / (self.values.len() as f64 - 1.0)).sqrt())
    }
}

/// Statistics for one group: the whole league or one squad.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub group: String,
    pub columns: Vec<ColumnStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SquadSummary {
    pub columns: Vec<String>,
    /// League-wide group first, then squads in name order.
    pub groups: Vec<GroupSummary>,
}

impl SquadSummary {
    pub fn headers(&self, squad_field: &str) -> Vec<String> {
        std::iter::once(squad_field.to_string())
            .chain(self.columns.iter().flat_map(|c| {
                [
                    format!("Median of {c}"),
                    format!("Mean of {c}"),
                    format!("Std of {c}"),
                ]
            }))
            .collect()
    }

    pub fn to_dataset(&self, squad_field: &str) -> Dataset {
        let schema = Schema::new(
            self.headers(squad_field)
                .into_iter()
                .map(|name| Field::new(name, "summary"))
                .collect(),
        );
        let records = self
            .groups
            .iter()
            .map(|group| {
                let mut values = vec![Value::text(group.group.clone())];
                for stats in &group.columns {
                    values.extend(
                        [stats.median(), stats.mean(), stats.std_dev()]
                            .map(|metric| metric.map_or(Value::Missing, Value::Number)),
                    );
                }
                Record::new(values)
            })
            .collect();
        Dataset::new(schema, records)
    }
}

/// Median, mean and sample standard deviation of every column in `columns`,
/// league-wide and per squad. Rows with no squad only count league-wide.
pub fn summarize(data: &Dataset, columns: &[usize], squad_field: &str) -> Result<SquadSummary> {
    let squad_idx = data.schema.require(squad_field, Stage::Summary, "dataset")?;
    let names = columns
        .iter()
        .filter_map(|&idx| data.schema.field(idx).map(|f| f.name.clone()))
        .collect();

    let mut squads: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in &data.records {
        if let Some(squad) = record.get(squad_idx).as_str() {
            squads.entry(squad.to_string()).or_default().push(record);
        }
    }

    let group = |label: String, records: &[&Record]| GroupSummary {
        group: label,
        columns: columns
            .iter()
            .map(|&idx| ColumnStats::from_values(column_values(records.iter().copied(), idx)))
            .collect(),
    };
    let everyone: Vec<&Record> = data.records.iter().collect();
    let mut groups = vec![group(ALL_GROUP.to_string(), &everyone)];
    groups.extend(squads.iter().map(|(squad, records)| group(squad.clone(), records)));

    info!(
        "Summarized {} numeric column(s) across {} squad(s)",
        columns.len(),
        squads.len()
    );
    Ok(SquadSummary {
        columns: names,
        groups,
    })
}

/// One row of a top/bottom listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub player: String,
    pub squad: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub column: String,
    pub highest: Vec<RankedEntry>,
    pub lowest: Vec<RankedEntry>,
}

/// The `n` highest and lowest records of each column. Equal values keep
/// their input order.
pub fn rank_extremes(
    data: &Dataset,
    columns: &[usize],
    n: usize,
    player_field: &str,
    squad_field: &str,
    missing_marker: &str,
) -> Vec<Ranking> {
    let player_idx = data.schema.column_index(player_field);
    let squad_idx = data.schema.column_index(squad_field);
    let label = |record: &Record, idx: Option<usize>| {
        idx.map(|i| record.get(i).as_display(missing_marker))
            .unwrap_or_else(|| missing_marker.to_string())
    };

    columns
        .iter()
        .filter_map(|&idx| {
            let column = data.schema.field(idx)?.name.clone();
            let scored: Vec<(f64, &Record)> = data
                .records
                .iter()
                .filter_map(|r| r.get(idx).as_number().map(|v| (v, r)))
                .collect();
            if scored.is_empty() {
                warn!("Column '{column}' has no values to rank");
            }
            let entry = |(value, record): &(f64, &Record)| RankedEntry {
                player: label(record, player_idx),
                squad: label(record, squad_idx),
                value: *value,
            };
            let highest = scored
                .iter()
                .sorted_by(|a, b| b.0.total_cmp(&a.0))
                .take(n)
                .map(entry)
                .collect();
            let lowest = scored
                .iter()
                .sorted_by(|a, b| a.0.total_cmp(&b.0))
                .take(n)
                .map(entry)
                .collect();
            Some(Ranking {
                column,
                highest,
                lowest,
            })
        })
        .collect()
}

/// Plain-text report with one highest and one lowest table per column.
pub fn render_report(rankings: &[Ranking], n: usize, player_field: &str, squad_field: &str) -> String {
    let mut output = String::new();
    for ranking in rankings {
        output.push_str(&format!("----------- {} -----------\n", ranking.column));
        if ranking.highest.is_empty() {
            output.push_str(&format!("No values to rank for {}\n\n", ranking.column));
            continue;
        }
        let headers = vec![
            player_field.to_string(),
            squad_field.to_string(),
            ranking.column.clone(),
        ];
        let aligns = [Align::Left, Align::Left, Align::Right];
        for (title, entries) in [("Highest", &ranking.highest), ("Lowest", &ranking.lowest)] {
            output.push_str(&format!("{title} {n} by {}:\n", ranking.column));
            let rows = entries
                .iter()
                .map(|e| vec![e.player.clone(), e.squad.clone(), format_number(e.value)])
                .collect_vec();
            output.push_str(&render_table(&headers, &rows, &aligns));
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Table;

    fn sample() -> Dataset {
        let rows = [
            ["Alice A", "Arsenal", "10", "FW"],
            ["Bob B", "Arsenal", "", "MF"],
            ["Carl C", "Chelsea", "30", "DF"],
            ["Dan D", "Chelsea", "30", "GK"],
            ["Eve E", "", "50", "FW"],
        ];
        Table::from_rows(
            "results",
            &["Player", "Squad", "Gls", "Pos"].map(String::from),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            "N/a",
        )
        .data
    }

    #[test]
    fn numeric_detection_requires_all_present_values_to_be_numbers() {
        let data = sample();
        assert_eq!(numeric_columns(&data, &[]), vec![2]);
        assert!(numeric_columns(&data, &["Gls".to_string()]).is_empty());
    }

    #[test]
    fn imputation_uses_the_league_mean() {
        let data = impute_means(&sample(), &[2]);
        assert_eq!(data.records[1].get(2), &Value::Number(30.0));
    }

    #[test]
    fn column_stats_match_sample_definitions() {
        let stats = ColumnStats::from_values(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.median(), Some(2.5));
        assert_eq!(stats.mean(), Some(2.5));
        let std = stats.std_dev().unwrap();
        assert!((std - 1.290_994).abs() < 1e-6);
        assert_eq!(ColumnStats::from_values(vec![7.0]).std_dev(), None);
        assert_eq!(ColumnStats::default().median(), None);
    }

    #[test]
    fn groups_start_with_the_league_then_squads_by_name() {
        let data = impute_means(&sample(), &[2]);
        let summary = summarize(&data, &[2], "Squad").unwrap();
        let groups: Vec<&str> = summary.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["all", "Arsenal", "Chelsea"]);
        assert_eq!(summary.groups[0].columns[0].count(), 5);
        assert_eq!(summary.groups[2].columns[0].std_dev(), Some(0.0));

        let table = summary.to_dataset("Squad");
        assert_eq!(
            table.schema.names(),
            vec!["Squad", "Median of Gls", "Mean of Gls", "Std of Gls"]
        );
        assert_eq!(table.records[1].get(1), &Value::Number(20.0));
    }

    #[test]
    fn summarize_requires_the_squad_field() {
        let err = summarize(&sample(), &[2], "Team").unwrap_err();
        assert_eq!(err.stage(), Stage::Summary);
    }

    #[test]
    fn rankings_keep_input_order_on_ties() {
        let data = impute_means(&sample(), &[2]);
        let rankings = rank_extremes(&data, &[2], 3, "Player", "Squad", "N/a");
        let top: Vec<&str> = rankings[0].highest.iter().map(|e| e.player.as_str()).collect();
        assert_eq!(top, vec!["Eve E", "Bob B", "Carl C"]);
        let bottom: Vec<&str> = rankings[0].lowest.iter().map(|e| e.player.as_str()).collect();
        assert_eq!(bottom, vec!["Alice A", "Bob B", "Carl C"]);
        assert_eq!(rankings[0].highest[0].squad, "N/a");
    }

    #[test]
    fn report_lists_both_extremes() {
        let data = impute_means(&sample(), &[2]);
        let rankings = rank_extremes(&data, &[2], 2, "Player", "Squad", "N/a");
        let report = render_report(&rankings, 2, "Player", "Squad");
        assert!(report.contains("----------- Gls -----------"));
        assert!(report.contains("Highest 2 by Gls:"));
        assert!(report.contains("Lowest 2 by Gls:"));
        assert!(report.contains("Eve E"));
    }
}
