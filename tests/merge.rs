mod common;

use std::collections::{HashMap, HashSet};

use common::sources;
use csv_consolidate::data::Field;
use csv_consolidate::export::export;
use csv_consolidate::loader::LoadOptions;
use csv_consolidate::merge::{MergeFailure, WarningReason};
use csv_consolidate::schema::reconcile_schema;
use csv_consolidate::{LoadError, load, merge};
use proptest::prelude::*;

fn rendered_rows(table: &csv_consolidate::table::Table) -> Vec<Vec<String>> {
    table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_ref().map(Field::text).unwrap_or_default().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn merge_fills_gaps_and_appends_new_keys() {
    let inputs = sources(&[
        ("a.csv", "id,name\n1,x\n"),
        ("b.csv", "id,age\n1,30\n"),
        ("c.csv", "id,name\n2,y\n"),
    ]);
    let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");

    assert_eq!(outcome.table.columns(), ["id", "name", "age"]);
    assert_eq!(
        rendered_rows(&outcome.table),
        vec![vec!["1", "x", "30"], vec!["2", "y", ""]]
    );
    assert_eq!(outcome.table.cell(1, "age"), None);
}

#[test]
fn merge_keeps_first_writer_value() {
    let inputs = sources(&[
        ("first.csv", "id,F\nK,a\n"),
        ("second.csv", "id,F,G\nK,b,g\n"),
    ]);
    let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");

    assert_eq!(
        outcome.table.find_row("id", "K"),
        Some(&vec![
            Some(Field::from("K")),
            Some(Field::from("a")),
            Some(Field::from("g")),
        ])
    );
}

#[test]
fn merge_matches_keys_across_numeric_spellings() {
    let inputs = sources(&[("a.csv", "id,v\n1,a\n"), ("b.csv", "id,w\n1.0,b\n")]);
    let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");
    assert_eq!(rendered_rows(&outcome.table), vec![vec!["1", "a", "b"]]);
}

#[test]
fn merge_keeps_distinct_decimal_spellings_apart() {
    let inputs = sources(&[("versions.csv", "version,notes\n1.1,first\n1.10,second\n")]);
    let outcome = merge(&inputs, "version", &LoadOptions::default()).expect("merge succeeds");

    assert!(outcome.warnings.is_empty());
    assert_eq!(
        rendered_rows(&outcome.table),
        vec![vec!["1.1", "first"], vec!["1.10", "second"]]
    );
}

#[test]
fn merge_does_not_join_exponent_keys_with_integers() {
    let inputs = sources(&[
        ("a.csv", "sku,price\n1e3,9.90\n"),
        ("b.csv", "sku,color\n1000,red\n"),
    ]);
    let outcome = merge(&inputs, "sku", &LoadOptions::default()).expect("merge succeeds");

    assert_eq!(
        export(&outcome.table, b',').expect("export"),
        "sku,price,color\n1e3,9.90,\n1000,,red\n"
    );
}

#[test]
fn merged_output_keeps_source_text() {
    let inputs = sources(&[
        ("a.csv", "id,price,flag,code\n1,19.90,TRUE,2.0\n"),
        ("b.csv", "id,note\n1.0,kept\n"),
    ]);
    let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");

    assert_eq!(
        export(&outcome.table, b',').expect("export"),
        "id,price,flag,code,note\n1,19.90,TRUE,2.0,kept\n"
    );
}

#[test]
fn merge_skips_source_without_key_column() {
    let inputs = sources(&[
        ("a.csv", "id,name\n1,x\n"),
        ("nokey.csv", "ref,extra\n9,z\n"),
        ("c.csv", "id,name\n2,y\n"),
    ]);
    let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");

    assert_eq!(outcome.table.columns(), ["id", "name"]);
    assert_eq!(outcome.table.row_count(), 2);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].source_index, 1);
    assert_eq!(outcome.warnings[0].source_name, "nokey.csv");
    assert_eq!(
        outcome.warnings[0].reason,
        WarningReason::MissingKey { key: "id".into() }
    );
    assert_eq!(outcome.summary.skipped, 1);
    assert_eq!(outcome.summary.accepted, 2);
}

#[test]
fn merge_skips_unloadable_sources_and_continues() {
    let inputs = sources(&[
        ("empty.csv", ""),
        ("header_only.csv", "id,name\n"),
        ("ragged.csv", "id,name\n1,x,extra\n"),
        ("good.csv", "id,name\n1,x\n"),
    ]);
    let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");

    assert_eq!(outcome.table.row_count(), 1);
    let reasons = outcome
        .warnings
        .iter()
        .map(|warning| (warning.source_index, warning.reason.code()))
        .collect::<Vec<_>>();
    assert_eq!(
        reasons,
        vec![(0, "LOAD_FAILED"), (1, "LOAD_FAILED"), (2, "LOAD_FAILED")]
    );
    assert_eq!(
        outcome.warnings[0].reason,
        WarningReason::LoadFailed(LoadError::Empty)
    );
}

#[test]
fn merge_fails_when_every_source_is_unusable() {
    let inputs = sources(&[("empty.csv", ""), ("nokey.csv", "name\nx\n")]);
    let failure = merge(&inputs, "id", &LoadOptions::default()).unwrap_err();

    assert!(matches!(failure, MergeFailure::NoValidSources { .. }));
    assert_eq!(failure.warnings().len(), 2);
    assert_eq!(failure.to_string(), "no valid sources to merge (2 skipped)");
}

#[test]
fn merge_trims_the_key_name() {
    let inputs = sources(&[("a.csv", " id ,name\n1,x\n")]);
    let outcome = merge(&inputs, " id", &LoadOptions::default()).expect("merge succeeds");
    assert_eq!(outcome.table.columns(), ["id", "name"]);
}

#[test]
fn reconciling_a_table_with_itself_changes_nothing() {
    let inputs = sources(&[("a.csv", "id,name,age\n1,x,3\n2,,4\n")]);
    let source = &inputs[0];
    let mut table = load(source, &LoadOptions::default()).expect("load");
    let before = table.clone();

    let delta = reconcile_schema(&mut table, &before, "id");

    assert!(delta.is_empty());
    assert_eq!(table, before);

    let doubled = merge(
        &[source.clone(), source.clone()],
        "id",
        &LoadOptions::default(),
    )
    .expect("merge succeeds");
    assert_eq!(doubled.table, before);
    assert_eq!(doubled.summary.rows_updated, 2);
    assert_eq!(doubled.summary.cells_filled, 0);
}

const POOL: &[&str] = &["name", "age", "city", "score", "email"];

#[derive(Debug, Clone)]
struct SourcePlan {
    columns: Vec<&'static str>,
    keys: Vec<u8>,
    cells: Vec<Vec<Option<String>>>,
}

impl SourcePlan {
    fn to_csv(&self) -> String {
        let mut text = std::iter::once("id")
            .chain(self.columns.iter().copied())
            .collect::<Vec<_>>()
            .join(",");
        text.push('\n');
        for (key, cells) in self.keys.iter().zip(&self.cells) {
            let mut fields = vec![key.to_string()];
            fields.extend(cells.iter().map(|cell| cell.clone().unwrap_or_default()));
            text.push_str(&fields.join(","));
            text.push('\n');
        }
        text
    }
}

fn source_plan() -> impl Strategy<Value = SourcePlan> {
    (
        proptest::sample::subsequence(POOL.to_vec(), 0..=POOL.len()),
        proptest::collection::btree_set(0u8..20, 1..8),
    )
        .prop_flat_map(|(columns, keys)| {
            let width = columns.len();
            let keys = keys.into_iter().collect::<Vec<_>>();
            let count = keys.len();
            (
                Just(columns),
                Just(keys).prop_shuffle(),
                proptest::collection::vec(
                    proptest::collection::vec(proptest::option::of("v[a-z]{1,3}"), width),
                    count,
                ),
            )
        })
        .prop_map(|(columns, keys, cells)| SourcePlan {
            columns,
            keys,
            cells,
        })
}

/// Straightforward model of the merge: first-seen order, first non-empty value wins.
fn expected(plans: &[SourcePlan]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut columns = vec!["id".to_string()];
    let mut keys: Vec<String> = Vec::new();
    let mut values: HashMap<(String, String), String> = HashMap::new();
    for plan in plans {
        for column in &plan.columns {
            if !columns.iter().any(|known| known.as_str() == *column) {
                columns.push(column.to_string());
            }
        }
        for (key, cells) in plan.keys.iter().zip(&plan.cells) {
            let key = key.to_string();
            if !keys.contains(&key) {
                keys.push(key.clone());
            }
            for (column, cell) in plan.columns.iter().zip(cells) {
                if let Some(cell) = cell {
                    values
                        .entry((key.clone(), column.to_string()))
                        .or_insert_with(|| cell.clone());
                }
            }
        }
    }
    let rows = keys
        .iter()
        .map(|key| {
            columns
                .iter()
                .map(|column| {
                    if column == "id" {
                        key.clone()
                    } else {
                        values
                            .get(&(key.clone(), column.clone()))
                            .cloned()
                            .unwrap_or_default()
                    }
                })
                .collect()
        })
        .collect();
    (columns, rows)
}

proptest! {
    #[test]
    fn merge_matches_first_writer_model(plans in proptest::collection::vec(source_plan(), 1..5)) {
        let texts = plans.iter().map(SourcePlan::to_csv).collect::<Vec<_>>();
        let inputs = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| csv_consolidate::Source::new(format!("s{idx}.csv"), text.as_str()))
            .collect::<Vec<_>>();

        let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");
        let (columns, rows) = expected(&plans);

        prop_assert!(outcome.warnings.is_empty());
        prop_assert_eq!(outcome.table.columns(), columns.as_slice());
        prop_assert_eq!(rendered_rows(&outcome.table), rows);
    }

    #[test]
    fn merged_keys_are_unique(plans in proptest::collection::vec(source_plan(), 1..5)) {
        let inputs = plans
            .iter()
            .enumerate()
            .map(|(idx, plan)| csv_consolidate::Source::new(format!("s{idx}.csv"), plan.to_csv()))
            .collect::<Vec<_>>();

        let outcome = merge(&inputs, "id", &LoadOptions::default()).expect("merge succeeds");
        let id_idx = outcome.table.column_index("id").expect("id column");
        let mut seen = HashSet::new();
        for row in outcome.table.rows() {
            let key = row[id_idx].as_ref().map(Field::key).expect("key present");
            prop_assert!(seen.insert(key));
        }
        prop_assert_eq!(outcome.summary.rows, seen.len());
    }

    #[test]
    fn schema_reconciliation_is_idempotent(first in source_plan(), second in source_plan()) {
        let options = LoadOptions::default();
        let mut accumulated = load(&csv_consolidate::Source::new("first.csv", first.to_csv()), &options)
            .expect("load first");
        let incoming = load(&csv_consolidate::Source::new("second.csv", second.to_csv()), &options)
            .expect("load second");

        let before = accumulated.clone();
        prop_assert!(reconcile_schema(&mut accumulated, &before, "id").is_empty());
        prop_assert_eq!(&accumulated, &before);

        let grown = reconcile_schema(&mut accumulated, &incoming, "id");
        let once = accumulated.clone();
        prop_assert!(reconcile_schema(&mut accumulated, &incoming, "id").is_empty());
        prop_assert_eq!(&accumulated, &once);
        prop_assert_eq!(
            accumulated.column_count(),
            before.column_count() + grown.added.len()
        );
        prop_assert!(incoming.columns().iter().all(|name| accumulated.has_column(name)));
    }
}
