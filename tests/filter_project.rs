mod common;

use common::{column, table};
use proptest::prelude::*;
use squad_reconcile::{
    data::Value,
    filter::ThresholdFilter,
    project::project,
};

#[test]
fn value_equal_to_cutoff_is_excluded() {
    let data = table(
        "results",
        &["Player", "Min"],
        &[&["Alice", "90"], &["Bob", "90.5"], &["Cara", "N/a"]],
    )
    .data;
    let filtered = ThresholdFilter::new("Min", 90.0).unwrap().apply(&data).unwrap();
    assert_eq!(column(&filtered, "Player"), vec!["Bob"]);
}

#[test]
fn percent_decorations_are_ignored() {
    let data = table(
        "results",
        &["Player", "Save%"],
        &[&["Alice", "71.4%"], &["Bob", "69.9 %"]],
    )
    .data;
    let filtered: ThresholdFilter = "Save% > 70".parse().unwrap();
    assert_eq!(column(&filtered.apply(&data).unwrap(), "Player"), vec!["Alice"]);
}

proptest! {
    #[test]
    fn filter_output_is_strictly_above_cutoff(
        minutes in prop::collection::vec(0u32..3000, 0..40),
        cutoff in 0u32..3000,
    ) {
        let rows: Vec<Vec<String>> = minutes
            .iter()
            .enumerate()
            .map(|(i, m)| vec![format!("P{i}"), m.to_string()])
            .collect();
        let refs: Vec<Vec<&str>> = rows.iter().map(|r| r.iter().map(String::as_str).collect()).collect();
        let slices: Vec<&[&str]> = refs.iter().map(Vec::as_slice).collect();
        let data = table("results", &["Player", "Min"], &slices).data;

        let filtered = ThresholdFilter::new("Min", f64::from(cutoff)).unwrap().apply(&data).unwrap();
        let expected = minutes.iter().filter(|m| **m > cutoff).count();
        prop_assert_eq!(filtered.len(), expected);
        for record in &filtered.records {
            let value = record.get(1).as_number().unwrap();
            prop_assert!(value > f64::from(cutoff));
        }
    }

    #[test]
    fn projection_is_idempotent(
        wanted in prop::collection::vec(prop::sample::select(vec!["Player", "Squad", "Min", "Gls", "xG", "Ast"]), 0..8),
    ) {
        let data = table(
            "results",
            &["Gls", "Player", "Min", "Squad"],
            &[&["3", "Alice", "900", "X"], &["", "Bob", "45", "Y"]],
        )
        .data;
        let canonical: Vec<String> = wanted.iter().map(|w| w.to_string()).collect();
        let once = project(&data, &canonical);
        let twice = project(&once, &canonical);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.len(), data.len());
        for name in once.schema.names() {
            prop_assert!(canonical.contains(&name));
        }
        if let Some(idx) = once.schema.column_index("Gls") {
            prop_assert_eq!(once.records[1].get(idx), &Value::Missing);
        }
    }
}
