mod common;

use proptest::prelude::*;
use review_agreement::{
    AgreementError, Table,
    config::MatchOptions,
    matcher::{self, MatchKind},
    value::CellValue,
};

use common::screening_table;

fn titles(name: &str, keys: &[&str]) -> Table {
    let rows = keys.iter().map(|k| vec![*k]).collect::<Vec<_>>();
    let rows = rows.iter().map(|r| r.as_slice()).collect::<Vec<_>>();
    screening_table(name, &[], &rows)
}

#[test]
fn exact_match_is_not_stolen_by_an_earlier_substring_match() {
    let a = titles("A", &["Deep Learning", "Deep Learning for Graphs"]);
    let b = titles("B", &["Deep Learning for Graphs", "Deep Learning"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    let pairs = outcome
        .pairs
        .iter()
        .map(|p| (p.row_a, p.row_b, p.kind))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        vec![(0, 1, MatchKind::Exact), (1, 0, MatchKind::Exact)]
    );
}

#[test]
fn keys_compare_trimmed_and_case_insensitive() {
    let a = titles("A", &["  Paper One "]);
    let b = titles("B", &["paper one"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].kind, MatchKind::Exact);
}

#[test]
fn fuzzy_match_at_the_floor_is_accepted_and_flagged() {
    // {machine, learning, survey, 2020} vs {machine, learning, review, 2021}: 2 / 4
    let a = titles("A", &["Machine Learning Survey 2020"]);
    let b = titles("B", &["machine learning review 2021"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].kind, MatchKind::Fuzzy { score: 0.5 });
    assert_eq!(outcome.ambiguities.len(), 1);
    assert_eq!(outcome.ambiguities[0].key_a, "Machine Learning Survey 2020");
    assert_eq!(outcome.ambiguities[0].score, 0.5);
}

#[test]
fn fuzzy_match_below_the_floor_is_rejected() {
    // 1 shared token out of 3
    let a = titles("A", &["graph neural networks"]);
    let b = titles("B", &["recurrent neural models"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert!(outcome.pairs.is_empty());
    assert_eq!(outcome.unmatched_a, vec![0]);
    assert_eq!(outcome.unmatched_b, vec![0]);
}

#[test]
fn confident_fuzzy_match_is_not_flagged() {
    // 4 of 5 tokens shared
    let a = titles("A", &["a study of sparse attention"]);
    let b = titles("B", &["a study on sparse attention"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert_eq!(outcome.pairs[0].kind, MatchKind::Fuzzy { score: 0.8 });
    assert!(outcome.ambiguities.is_empty());
}

#[test]
fn fuzzy_match_prefers_the_highest_score_over_table_order() {
    // row 0 shares 2 of 4 tokens, row 1 shares 3 of 4
    let a = titles("A", &["alpha beta gamma delta"]);
    let b = titles("B", &["alpha beta x y", "alpha beta gamma z"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].row_b, 1);
    assert_eq!(outcome.pairs[0].kind, MatchKind::Fuzzy { score: 0.75 });
    assert_eq!(outcome.unmatched_b, vec![0]);
}

#[test]
fn tied_fuzzy_scores_go_to_the_first_row() {
    let a = titles("A", &["alpha beta gamma delta"]);
    let b = titles("B", &["alpha beta gamma x", "alpha beta gamma y"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].row_b, 0);
    assert_eq!(outcome.pairs[0].kind, MatchKind::Fuzzy { score: 0.75 });
    assert_eq!(outcome.unmatched_b, vec![1]);
}

#[test]
fn duplicate_keys_pair_in_table_order() {
    let a = titles("A", &["Same", "Same"]);
    let b = titles("B", &["same", "same", "same"]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    let pairs = outcome
        .pairs
        .iter()
        .map(|p| (p.row_a, p.row_b))
        .collect::<Vec<_>>();
    assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    assert_eq!(outcome.unmatched_b, vec![2]);
}

#[test]
fn empty_keys_never_match() {
    let a = Table::from_records(
        "A",
        vec![
            vec![("Title", CellValue::Null)],
            vec![("Title", CellValue::from("   "))],
        ],
    );
    let b = Table::from_records("B", vec![vec![("Title", CellValue::from("anything"))]]);
    let outcome = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
    assert!(outcome.pairs.is_empty());
    assert_eq!(outcome.unmatched_a, vec![0, 1]);
}

#[test]
fn missing_key_column_names_available_columns() {
    let a = screening_table("A", &["Q1"], &[&["X", "TRUE"]]);
    let b = Table::from_records("B", vec![vec![("Paper", CellValue::from("X"))]]);
    let err = matcher::match_rows(&a, &b, "Title", &MatchOptions::default())
        .expect_err("B has no Title column");
    match &err {
        AgreementError::Schema {
            column,
            table,
            available,
        } => {
            assert_eq!(column, "Title");
            assert_eq!(table, "B");
            assert_eq!(available, &vec!["Paper".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn locate_falls_back_to_a_title_like_column() {
    let table = Table::from_records(
        "refs",
        vec![
            vec![("Paper Title", CellValue::from("Attention Is All You Need"))],
            vec![(
                "Paper Title",
                CellValue::from("BERT: Pre-training of Deep Bidirectional Transformers"),
            )],
        ],
    );
    let found = matcher::locate(&table, "bert", "Title", &MatchOptions::default())
        .unwrap()
        .expect("substring match");
    assert_eq!(found.row, 1);
    assert_eq!(found.column, "Paper Title");
    assert_eq!(found.kind, MatchKind::Substring);

    let missing =
        matcher::locate(&table, "unrelated query text", "Title", &MatchOptions::default())
            .unwrap();
    assert!(missing.is_none());
}

fn key_strategy() -> impl Strategy<Value = String> {
    let word = prop_oneof![Just("alpha"), Just("beta"), Just("gamma"), Just("delta")];
    prop::collection::vec(word, 1..4).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn matching_is_deterministic_and_one_to_one(
        keys_a in prop::collection::vec(key_strategy(), 0..8),
        keys_b in prop::collection::vec(key_strategy(), 0..8),
    ) {
        let a = titles("A", &keys_a.iter().map(String::as_str).collect::<Vec<_>>());
        let b = titles("B", &keys_b.iter().map(String::as_str).collect::<Vec<_>>());
        let first = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
        let second = matcher::match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
        prop_assert_eq!(&first, &second);

        prop_assert_eq!(first.pairs.len() + first.unmatched_a.len(), keys_a.len());
        prop_assert_eq!(first.pairs.len() + first.unmatched_b.len(), keys_b.len());
        let mut used = first.pairs.iter().map(|p| p.row_b).collect::<Vec<_>>();
        used.sort_unstable();
        used.dedup();
        prop_assert_eq!(used.len(), first.pairs.len());
        prop_assert!(first.pairs.windows(2).all(|w| w[0].row_a < w[1].row_a));
    }
}
