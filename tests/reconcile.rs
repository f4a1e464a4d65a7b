mod common;

use common::{column, table};
use squad_reconcile::{
    cleanse::{CleanseRules, cleanse},
    data::Value,
    error::{ReconcileError, Stage},
    filter::ThresholdFilter,
    merge::{IdentityKey, merge_tables},
    pipeline::{MergeOptions, reconcile},
    project::project_merged,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn colliding_fields_keep_first_table_bare_name() {
    let a = table(
        "A",
        &["Player", "Squad", "Gls"],
        &[&["John Doe", "X", "3"]],
    );
    let b = table(
        "B",
        &["Player", "Squad", "Gls"],
        &[&["John Doe", "X", "5"]],
    );
    let merged = merge_tables(vec![a, b], &IdentityKey::default()).unwrap();
    let projected = project_merged(&merged, &strings(&["Player", "Squad", "Gls", "Gls_B"]));
    assert_eq!(projected.schema().names(), vec!["Player", "Squad", "Gls", "Gls_B"]);
    assert_eq!(projected.records()[0].get(2), &Value::Number(3.0));
    assert_eq!(projected.records()[0].get(3), &Value::Number(5.0));
    assert_eq!(
        projected.provenance("Gls_B").unwrap().origin.renamed_from.as_deref(),
        Some("Gls")
    );
}

#[test]
fn repeated_header_rows_are_removed_before_merging() {
    let raw = table(
        "Standard",
        &["Rk", "Player", "Squad"],
        &[&["Rk", "Rk", "Squad"], &["1", "Alice", "X"]],
    );
    let (cleansed, report) = cleanse(raw, &CleanseRules::default());
    assert_eq!(report.removed(), 1);
    assert_eq!(column(&cleansed.data, "Player"), vec!["Alice"]);
}

#[test]
fn merging_a_table_without_the_key_names_the_culprit() {
    let standard = table("Standard", &["Player", "Squad"], &[&["Alice", "X"]]);
    let keepers = table("Goalkeeping", &["Player", "Team"], &[&["Alice", "X"]]);
    let err = merge_tables(vec![standard, keepers], &IdentityKey::default()).unwrap_err();
    match err {
        ReconcileError::MissingRequiredField {
            stage,
            field,
            source_label,
        } => {
            assert_eq!(stage, Stage::Merge);
            assert_eq!(field, "Squad");
            assert_eq!(source_label, "Goalkeeping");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn eligibility_uses_decorated_minutes() {
    let options = MergeOptions {
        key: IdentityKey::default(),
        cleanse: CleanseRules::default(),
        eligibility: Some(ThresholdFilter::new("Min", 90.0).unwrap()),
        sort_field: Some("Player".to_string()),
        canonical: strings(&["Player", "Squad", "Min"]),
        missing_marker: "N/a".to_string(),
    };
    let standard = table(
        "Standard",
        &["Rk", "Player", "Squad", "Min"],
        &[
            &["1", "Zoe Z", "X", "1,350"],
            &["2", "Adam A", "X", "90"],
            &["3", "Mia M", "Y", ""],
            &["4", "Ben B", "Y", "91"],
        ],
    );
    let merged = reconcile(vec![standard], &options).unwrap();
    assert_eq!(column(merged.data(), "Player"), vec!["Ben B", "Zoe Z"]);
}

#[test]
fn absent_minutes_column_fails_the_filter_stage() {
    let options = MergeOptions {
        key: IdentityKey::default(),
        cleanse: CleanseRules::default(),
        eligibility: Some(ThresholdFilter::new("Min", 90.0).unwrap()),
        sort_field: None,
        canonical: strings(&["Player"]),
        missing_marker: "N/a".to_string(),
    };
    let standard = table("Standard", &["Player", "Squad"], &[&["Alice", "X"]]);
    let err = reconcile(vec![standard], &options).unwrap_err();
    assert_eq!(err.stage(), Stage::Filter);
}

#[test]
fn eight_categories_fold_into_one_report() {
    let labels = [
        "Standard",
        "Goalkeeping",
        "Shooting",
        "Passing",
        "GnS Creation",
        "Defensive act",
        "Possession",
        "Misc",
    ];
    let tables = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let value = i.to_string();
            table(
                label,
                &["Player", "Squad", "Att"],
                &[&["Alice", "X", value.as_str()]],
            )
        })
        .collect();
    let merged = merge_tables(tables, &IdentityKey::default()).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.renames().len(), labels.len() - 1);
    assert_eq!(column(merged.data(), "Att"), vec!["0"]);
    assert_eq!(column(merged.data(), "Att_Defensive act"), vec!["5"]);
    assert_eq!(column(merged.data(), "Att_Misc"), vec!["7"]);
}
