//! Comparison reports over two aligned rating tables.
//!
//! [`compare`] aligns the tables once, then for every requested column
//! normalizes the paired cells, tallies raw agreement, builds the binary
//! confusion matrix and computes the agreement metrics. Column-level problems
//! (a column missing from one table, no binary observations) are recorded on
//! the column and never abort the report.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    config::CompareConfig,
    confusion::{ConfusionMatrix, Exclusions, Observed},
    error::{AgreementError, AgreementResult, MatchAmbiguity},
    matcher::{self, Alignment, MatchOutcome},
    metrics::{AgreementMetrics, Band, categorical_kappa},
    normalize::{Label, normalize},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStatus {
    Computed,
    /// Compared, but no observation had TRUE/FALSE on both sides.
    NotComputable,
    /// The column is missing from at least one table.
    Failed,
}

impl ColumnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnStatus::Computed => "computed",
            ColumnStatus::NotComputable => "not computable",
            ColumnStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementCategory {
    ATrueBFalse,
    AFalseBTrue,
    Other,
}

impl DisagreementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisagreementCategory::ATrueBFalse => "a_true_b_false",
            DisagreementCategory::AFalseBTrue => "a_false_b_true",
            DisagreementCategory::Other => "other",
        }
    }

    fn of(a: &Observed, b: &Observed) -> Self {
        match (a.label(), b.label()) {
            (Some(Label::True), Some(Label::False)) => DisagreementCategory::ATrueBFalse,
            (Some(Label::False), Some(Label::True)) => DisagreementCategory::AFalseBTrue,
            _ => DisagreementCategory::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disagreement {
    pub key: String,
    /// Zero-based row in table A; `None` for a positional row only B has.
    pub row_a: Option<usize>,
    pub row_b: Option<usize>,
    pub value_a: Observed,
    pub value_b: Observed,
    pub category: DisagreementCategory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DisagreementSummary {
    pub a_true_b_false: usize,
    pub a_false_b_true: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AgreementTally {
    pub comparisons: usize,
    pub agreements: usize,
    pub disagreements: usize,
    /// Percentage of comparisons whose normalized values are equal.
    pub agreement_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub column: String,
    pub status: ColumnStatus,
    pub error: Option<AgreementError>,
    pub tally: AgreementTally,
    pub confusion_matrix: ConfusionMatrix,
    pub excluded: Exclusions,
    pub metrics: Option<AgreementMetrics>,
    /// Multi-category Kappa over matched pairs with both cells present.
    pub categorical_kappa: Option<f64>,
    pub disagreement_summary: DisagreementSummary,
    pub disagreements: Vec<Disagreement>,
}

impl ColumnReport {
    fn failed(column: &str, error: AgreementError) -> Self {
        Self {
            column: column.to_string(),
            status: ColumnStatus::Failed,
            error: Some(error),
            tally: AgreementTally::default(),
            confusion_matrix: ConfusionMatrix::default(),
            excluded: Exclusions::default(),
            metrics: None,
            categorical_kappa: None,
            disagreement_summary: DisagreementSummary::default(),
            disagreements: Vec::new(),
        }
    }

    pub fn kappa(&self) -> Option<f64> {
        self.metrics.as_ref().map(|m| m.cohens_kappa.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowBookkeeping {
    pub rows_a: usize,
    pub rows_b: usize,
    pub matched: usize,
    pub unmatched_a: usize,
    pub unmatched_b: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub columns_compared: usize,
    pub columns_failed: usize,
    pub total_comparisons: usize,
    pub total_agreements: usize,
    pub overall_agreement_rate: Option<f64>,
    pub average_kappa: Option<f64>,
    pub average_kappa_band: Option<Band>,
    pub perfect_columns: Vec<String>,
    pub columns_with_disagreements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub table_a: String,
    pub table_b: String,
    /// `None` when rows were aligned by position.
    pub key_column: Option<String>,
    pub rows: RowBookkeeping,
    pub unmatched_a_keys: Vec<String>,
    pub unmatched_b_keys: Vec<String>,
    pub ambiguities: Vec<MatchAmbiguity>,
    pub columns: Vec<ColumnReport>,
    pub summary: ReportSummary,
}

/// Column layout of two tables side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOverview {
    pub table_a: String,
    pub table_b: String,
    pub columns_a: Vec<String>,
    pub columns_b: Vec<String>,
    pub rows_a: usize,
    pub rows_b: usize,
    pub common_columns: Vec<String>,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub row_count_match: bool,
}

impl TableOverview {
    pub fn of(a: &Table, b: &Table) -> Self {
        let common_columns = a
            .columns()
            .iter()
            .filter(|c| b.has_column(c))
            .cloned()
            .collect_vec();
        let only_in_a = a
            .columns()
            .iter()
            .filter(|c| !b.has_column(c))
            .cloned()
            .collect_vec();
        let only_in_b = b
            .columns()
            .iter()
            .filter(|c| !a.has_column(c))
            .cloned()
            .collect_vec();
        Self {
            table_a: a.name().to_string(),
            table_b: b.name().to_string(),
            columns_a: a.columns().to_vec(),
            columns_b: b.columns().to_vec(),
            rows_a: a.row_count(),
            rows_b: b.row_count(),
            common_columns,
            only_in_a,
            only_in_b,
            row_count_match: a.row_count() == b.row_count(),
        }
    }
}

/// Columns present in both tables except `key_column`, in `a`'s order.
pub fn common_columns(a: &Table, b: &Table, key_column: Option<&str>) -> Vec<String> {
    a.columns()
        .iter()
        .filter(|c| b.has_column(c) && Some(c.as_str()) != key_column)
        .cloned()
        .collect()
}

/// Compares `columns` of `a` and `b`, listed in the requested order.
///
/// Fails only when the key column of a key alignment is missing from either
/// table; every other problem is recorded on the affected column.
pub fn compare(
    a: &Table,
    b: &Table,
    columns: &[String],
    alignment: &Alignment,
    config: &CompareConfig,
) -> AgreementResult<ComparisonReport> {
    let outcome = matcher::align(a, b, alignment, &config.matching)?;
    let key_column = match alignment {
        Alignment::ByKey(column) => Some(column.clone()),
        Alignment::ByPosition => None,
    };
    let keys_a = row_keys(a, key_column.as_deref());
    let keys_b = row_keys(b, key_column.as_deref());

    let column_reports = columns
        .iter()
        .map(|column| compare_column(a, b, column, alignment, &outcome, (&keys_a, &keys_b)))
        .collect_vec();
    let summary = summarize(&column_reports);

    Ok(ComparisonReport {
        table_a: a.name().to_string(),
        table_b: b.name().to_string(),
        key_column,
        rows: RowBookkeeping {
            rows_a: a.row_count(),
            rows_b: b.row_count(),
            matched: outcome.pairs.len(),
            unmatched_a: outcome.unmatched_a.len(),
            unmatched_b: outcome.unmatched_b.len(),
        },
        unmatched_a_keys: outcome.unmatched_a.iter().map(|r| keys_a[*r].clone()).collect(),
        unmatched_b_keys: outcome.unmatched_b.iter().map(|r| keys_b[*r].clone()).collect(),
        ambiguities: outcome.ambiguities,
        columns: column_reports,
        summary,
    })
}

/// Report for a single column; a missing column is returned as an error.
pub fn column_report(
    a: &Table,
    b: &Table,
    column: &str,
    alignment: &Alignment,
    config: &CompareConfig,
) -> AgreementResult<ColumnReport> {
    let mut report = compare(a, b, &[column.to_string()], alignment, config)?;
    let column_report = report.columns.remove(0);
    match (&column_report.status, &column_report.error) {
        (ColumnStatus::Failed, Some(error)) => Err(error.clone()),
        _ => Ok(column_report),
    }
}

fn row_keys(table: &Table, key_column: Option<&str>) -> Vec<String> {
    let column = key_column.and_then(|name| table.column_index(name));
    (0..table.row_count())
        .map(|row| match column {
            Some(idx) => table
                .cell(row, idx)
                .as_text()
                .map(|text| text.trim().to_string())
                .unwrap_or_default(),
            None => format!("row {}", row + 1),
        })
        .collect()
}

fn require_in_both(a: &Table, b: &Table, column: &str) -> AgreementResult<(usize, usize)> {
    let schema_error = |table: &Table| AgreementError::Schema {
        column: column.to_string(),
        table: table.name().to_string(),
        available: table.columns().to_vec(),
    };
    let idx_a = a.column_index(column).ok_or_else(|| schema_error(a))?;
    let idx_b = b.column_index(column).ok_or_else(|| schema_error(b))?;
    Ok((idx_a, idx_b))
}

struct Observation {
    row_a: Option<usize>,
    row_b: Option<usize>,
    a: Observed,
    b: Observed,
}

fn compare_column(
    a: &Table,
    b: &Table,
    column: &str,
    alignment: &Alignment,
    outcome: &MatchOutcome,
    (keys_a, keys_b): (&[String], &[String]),
) -> ColumnReport {
    let (idx_a, idx_b) = match require_in_both(a, b, column) {
        Ok(indices) => indices,
        Err(error) => return ColumnReport::failed(column, error),
    };

    let mut observations = outcome
        .pairs
        .iter()
        .map(|pair| Observation {
            row_a: Some(pair.row_a),
            row_b: Some(pair.row_b),
            a: Observed::Label(normalize(a.cell(pair.row_a, idx_a))),
            b: Observed::Label(normalize(b.cell(pair.row_b, idx_b))),
        })
        .chain(outcome.unmatched_a.iter().map(|&row_a| Observation {
            row_a: Some(row_a),
            row_b: None,
            a: Observed::Label(normalize(a.cell(row_a, idx_a))),
            b: Observed::NotFound,
        }))
        .collect_vec();
    // Positions past the end of A are still compared; keyed B-only rows are not.
    if *alignment == Alignment::ByPosition {
        observations.extend(outcome.unmatched_b.iter().map(|&row_b| Observation {
            row_a: None,
            row_b: Some(row_b),
            a: Observed::NotFound,
            b: Observed::Label(normalize(b.cell(row_b, idx_b))),
        }));
    }
    observations.sort_by_key(|obs| obs.row_a.or(obs.row_b));

    let mut tally = AgreementTally {
        comparisons: observations.len(),
        ..AgreementTally::default()
    };
    let mut summary = DisagreementSummary::default();
    let mut disagreements = Vec::new();
    for obs in &observations {
        if obs.a == obs.b {
            tally.agreements += 1;
            continue;
        }
        tally.disagreements += 1;
        let category = DisagreementCategory::of(&obs.a, &obs.b);
        match category {
            DisagreementCategory::ATrueBFalse => summary.a_true_b_false += 1,
            DisagreementCategory::AFalseBTrue => summary.a_false_b_true += 1,
            DisagreementCategory::Other => summary.other += 1,
        }
        let key = match (obs.row_a, obs.row_b) {
            (Some(row), _) => keys_a[row].clone(),
            (None, Some(row)) => keys_b[row].clone(),
            (None, None) => String::new(),
        };
        disagreements.push(Disagreement {
            key,
            row_a: obs.row_a,
            row_b: obs.row_b,
            value_a: obs.a.clone(),
            value_b: obs.b.clone(),
            category,
        });
    }
    if tally.comparisons > 0 {
        tally.agreement_rate = Some(tally.agreements as f64 / tally.comparisons as f64 * 100.0);
    }

    let (matrix, excluded) =
        ConfusionMatrix::from_pairs(observations.iter().map(|o| (&o.a, &o.b)));
    let metrics = AgreementMetrics::compute(&matrix);
    let (status, error) = match &metrics {
        Some(_) => (ColumnStatus::Computed, None),
        None => (
            ColumnStatus::NotComputable,
            Some(AgreementError::InsufficientData {
                column: column.to_string(),
            }),
        ),
    };

    let categorical_pairs = observations
        .iter()
        .filter_map(|obs| match (obs.a.label(), obs.b.label()) {
            (Some(la), Some(lb)) if *la != Label::Null && *lb != Label::Null => {
                Some((la.clone(), lb.clone()))
            }
            _ => None,
        })
        .collect_vec();

    ColumnReport {
        column: column.to_string(),
        status,
        error,
        tally,
        confusion_matrix: matrix,
        excluded,
        metrics,
        categorical_kappa: categorical_kappa(&categorical_pairs),
        disagreement_summary: summary,
        disagreements,
    }
}

fn summarize(columns: &[ColumnReport]) -> ReportSummary {
    let mut summary = ReportSummary::default();
    let mut kappas = Vec::new();
    for column in columns {
        if column.status == ColumnStatus::Failed {
            summary.columns_failed += 1;
            continue;
        }
        summary.columns_compared += 1;
        summary.total_comparisons += column.tally.comparisons;
        summary.total_agreements += column.tally.agreements;
        if let Some(kappa) = column.kappa() {
            kappas.push(kappa);
        }
        if column.tally.comparisons > 0 && column.tally.disagreements == 0 {
            summary.perfect_columns.push(column.column.clone());
        }
        if column.tally.disagreements > 0 {
            summary.columns_with_disagreements.push(column.column.clone());
        }
    }
    if summary.total_comparisons > 0 {
        summary.overall_agreement_rate =
            Some(summary.total_agreements as f64 / summary.total_comparisons as f64 * 100.0);
    }
    if !kappas.is_empty() {
        let average = kappas.iter().sum::<f64>() / kappas.len() as f64;
        summary.average_kappa = Some(average);
        summary.average_kappa_band = Some(Band::of(average));
    }
    summary
}
