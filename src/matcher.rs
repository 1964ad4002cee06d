//! Row alignment between two rating tables.
//!
//! Rows are paired through a key column (normally the paper title). Keys are
//! compared trimmed and lower-cased, and three strategies are tried in strict
//! precedence:
//!
//! 1. **exact**: identical keys;
//! 2. **substring**: one key contains the other, first candidate in table order;
//! 3. **fuzzy**: whitespace-token overlap `|A ∩ B| / max(|A|, |B|)`, best score
//!    at or above the floor, ties to the first candidate in table order.
//!
//! Each strategy is a complete pass over table A before the next one starts,
//! so a looser match made for one row can never take a B row that another A
//! row matches exactly. Rows with an empty key never match.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::{
    config::MatchOptions,
    error::{AgreementError, AgreementResult, MatchAmbiguity},
    table::Table,
};

/// How rows of the two tables are paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    ByKey(String),
    ByPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Substring,
    Fuzzy { score: f64 },
    Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPair {
    pub row_a: usize,
    pub row_b: usize,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchOutcome {
    /// Pairs ordered by `row_a`.
    pub pairs: Vec<RowPair>,
    pub unmatched_a: Vec<usize>,
    pub unmatched_b: Vec<usize>,
    pub ambiguities: Vec<MatchAmbiguity>,
}

/// Result of looking up a single title in one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located {
    /// Zero-based data row.
    pub row: usize,
    pub column: String,
    pub matched_key: String,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Exact,
    Substring,
    Fuzzy,
}

const STRATEGIES: [Strategy; 3] = [Strategy::Exact, Strategy::Substring, Strategy::Fuzzy];

#[derive(Debug, Clone)]
struct MatchKey {
    display: String,
    text: String,
    tokens: HashSet<String>,
}

impl MatchKey {
    fn parse(raw: &str) -> Option<Self> {
        let display = raw.trim();
        if display.is_empty() {
            return None;
        }
        let text = display.to_lowercase();
        let tokens = text.split_whitespace().map(str::to_string).collect();
        Some(Self {
            display: display.to_string(),
            text,
            tokens,
        })
    }
}

/// Share of tokens two keys have in common, relative to the larger key.
pub fn token_overlap(left: &str, right: &str) -> f64 {
    let left = left.to_lowercase();
    let right = right.to_lowercase();
    let left = left.split_whitespace().collect::<HashSet<_>>();
    let right = right.split_whitespace().collect::<HashSet<_>>();
    overlap_score(&left, &right)
}

fn overlap_score<T: Eq + std::hash::Hash>(left: &HashSet<T>, right: &HashSet<T>) -> f64 {
    let larger = left.len().max(right.len());
    if larger == 0 {
        return 0.0;
    }
    left.intersection(right).count() as f64 / larger as f64
}

fn find_candidate<'k, I>(
    key: &MatchKey,
    candidates: I,
    strategy: Strategy,
    options: &MatchOptions,
) -> Option<(usize, MatchKind)>
where
    I: IntoIterator<Item = (usize, &'k MatchKey)>,
{
    let mut candidates = candidates.into_iter();
    match strategy {
        Strategy::Exact => candidates
            .find(|(_, other)| other.text == key.text)
            .map(|(idx, _)| (idx, MatchKind::Exact)),
        Strategy::Substring => candidates
            .find(|(_, other)| other.text.contains(&key.text) || key.text.contains(&other.text))
            .map(|(idx, _)| (idx, MatchKind::Substring)),
        Strategy::Fuzzy => {
            let mut best: Option<(usize, f64)> = None;
            for (idx, other) in candidates {
                let score = overlap_score(&key.tokens, &other.tokens);
                if score >= options.fuzzy_floor && best.is_none_or(|(_, top)| score > top) {
                    best = Some((idx, score));
                }
            }
            best.map(|(idx, score)| (idx, MatchKind::Fuzzy { score }))
        }
    }
}

fn require_column(table: &Table, column: &str) -> AgreementResult<usize> {
    table
        .column_index(column)
        .ok_or_else(|| AgreementError::Schema {
            column: column.to_string(),
            table: table.name().to_string(),
            available: table.columns().to_vec(),
        })
}

fn keys_for(table: &Table, column: usize) -> Vec<Option<MatchKey>> {
    table
        .column_cells(column)
        .map(|cell| cell.as_text().as_deref().and_then(MatchKey::parse))
        .collect()
}

/// Pairs the rows of `a` and `b` through `key_column`.
pub fn match_rows(
    a: &Table,
    b: &Table,
    key_column: &str,
    options: &MatchOptions,
) -> AgreementResult<MatchOutcome> {
    let column_a = require_column(a, key_column)?;
    let column_b = require_column(b, key_column)?;
    let keys_a = keys_for(a, column_a);
    let keys_b = keys_for(b, column_b);

    let mut partner: Vec<Option<(usize, MatchKind)>> = vec![None; keys_a.len()];
    let mut taken = vec![false; keys_b.len()];

    for strategy in STRATEGIES {
        for (row_a, key) in keys_a.iter().enumerate() {
            let Some(key) = key else { continue };
            if partner[row_a].is_some() {
                continue;
            }
            let open = keys_b
                .iter()
                .enumerate()
                .filter(|(row_b, _)| !taken[*row_b])
                .filter_map(|(row_b, other)| other.as_ref().map(|k| (row_b, k)));
            if let Some((row_b, kind)) = find_candidate(key, open, strategy, options) {
                taken[row_b] = true;
                partner[row_a] = Some((row_b, kind));
            }
        }
    }

    let mut outcome = MatchOutcome::default();
    for (row_a, slot) in partner.into_iter().enumerate() {
        match slot {
            Some((row_b, kind)) => {
                if let MatchKind::Fuzzy { score } = kind
                    && score < options.confident_score
                    && let (Some(key_a), Some(key_b)) = (&keys_a[row_a], &keys_b[row_b])
                {
                    outcome.ambiguities.push(MatchAmbiguity {
                        row_a,
                        row_b,
                        key_a: key_a.display.clone(),
                        key_b: key_b.display.clone(),
                        score,
                    });
                }
                outcome.pairs.push(RowPair { row_a, row_b, kind });
            }
            None => outcome.unmatched_a.push(row_a),
        }
    }
    outcome.unmatched_b = taken
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(row_b, _)| row_b)
        .collect();

    debug!(
        "Matched {} row(s) on '{}': {} unmatched in {}, {} unmatched in {}, {} ambiguous",
        outcome.pairs.len(),
        key_column,
        outcome.unmatched_a.len(),
        a.name(),
        outcome.unmatched_b.len(),
        b.name(),
        outcome.ambiguities.len()
    );
    Ok(outcome)
}

/// Pairs row `i` of `a` with row `i` of `b`; surplus rows stay unmatched.
pub fn align_by_position(a: &Table, b: &Table) -> MatchOutcome {
    let shared = a.row_count().min(b.row_count());
    MatchOutcome {
        pairs: (0..shared)
            .map(|row| RowPair {
                row_a: row,
                row_b: row,
                kind: MatchKind::Position,
            })
            .collect(),
        unmatched_a: (shared..a.row_count()).collect(),
        unmatched_b: (shared..b.row_count()).collect(),
        ambiguities: Vec::new(),
    }
}

pub fn align(
    a: &Table,
    b: &Table,
    alignment: &Alignment,
    options: &MatchOptions,
) -> AgreementResult<MatchOutcome> {
    match alignment {
        Alignment::ByKey(column) => match_rows(a, b, column, options),
        Alignment::ByPosition => Ok(align_by_position(a, b)),
    }
}

/// Resolves the title column of `table`: `requested` when present, otherwise
/// the first column whose name contains "title".
pub fn resolve_title_column(table: &Table, requested: &str) -> AgreementResult<String> {
    if table.has_column(requested) {
        return Ok(requested.to_string());
    }
    table
        .columns()
        .iter()
        .find(|column| column.to_lowercase().contains("title"))
        .cloned()
        .ok_or_else(|| AgreementError::Schema {
            column: requested.to_string(),
            table: table.name().to_string(),
            available: table.columns().to_vec(),
        })
}

/// Finds the row of `table` whose key best matches `title`.
pub fn locate(
    table: &Table,
    title: &str,
    key_column: &str,
    options: &MatchOptions,
) -> AgreementResult<Option<Located>> {
    let column = resolve_title_column(table, key_column)?;
    let Some(query) = MatchKey::parse(title) else {
        return Ok(None);
    };
    let keys = keys_for(table, require_column(table, &column)?);
    for strategy in STRATEGIES {
        let candidates = keys
            .iter()
            .enumerate()
            .filter_map(|(row, key)| key.as_ref().map(|k| (row, k)));
        if let Some((row, kind)) = find_candidate(&query, candidates, strategy, options) {
            let matched_key = keys[row]
                .as_ref()
                .map(|k| k.display.clone())
                .unwrap_or_default();
            return Ok(Some(Located {
                row,
                column,
                matched_key,
                kind,
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    fn titles(name: &str, titles: &[&str]) -> Table {
        Table::from_records(
            name,
            titles
                .iter()
                .map(|t| vec![("Title", CellValue::from(*t))])
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn overlap_uses_the_larger_token_set() {
        assert_eq!(
            token_overlap("graph neural networks survey", "graph neural models review"),
            0.5
        );
        assert_eq!(token_overlap("Deep Learning For Vision", "vision analysis"), 0.25);
        assert_eq!(token_overlap("", ""), 0.0);
    }

    #[test]
    fn later_exact_match_is_not_stolen_by_earlier_substring() {
        let a = titles("A", &["Paper A (draft)", "Paper A"]);
        let b = titles("B", &["Paper A"]);
        let outcome = match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
        assert_eq!(
            outcome.pairs,
            vec![RowPair {
                row_a: 1,
                row_b: 0,
                kind: MatchKind::Exact
            }]
        );
        assert_eq!(outcome.unmatched_a, vec![0]);
    }

    #[test]
    fn empty_keys_never_match() {
        let a = Table::from_records("A", vec![vec![("Title", CellValue::Null)]]);
        let b = titles("B", &["anything"]);
        let outcome = match_rows(&a, &b, "Title", &MatchOptions::default()).unwrap();
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.unmatched_a, vec![0]);
        assert_eq!(outcome.unmatched_b, vec![0]);
    }

    #[test]
    fn position_alignment_leaves_surplus_rows_unmatched() {
        let a = titles("A", &["x", "y", "z"]);
        let b = titles("B", &["p"]);
        let outcome = align_by_position(&a, &b);
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.unmatched_a, vec![1, 2]);
        assert!(outcome.unmatched_b.is_empty());
    }

    #[test]
    fn resolve_title_column_falls_back_to_title_like_names() {
        let table = Table::from_records("T", vec![vec![("Paper Title", CellValue::from("x"))]]);
        assert_eq!(resolve_title_column(&table, "Title").unwrap(), "Paper Title");
        let untitled = Table::from_records("U", vec![vec![("Name", CellValue::from("x"))]]);
        assert!(matches!(
            resolve_title_column(&untitled, "Title"),
            Err(AgreementError::Schema { .. })
        ));
    }
}
