use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the agreement engine.
///
/// Neither variant is fatal to a batch: a missing key column fails one table
/// pair, a missing compare column fails one column of a report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgreementError {
    #[error(
        "Column '{column}' not found in {table}. Available columns: {}",
        .available.join(", ")
    )]
    Schema {
        column: String,
        table: String,
        available: Vec<String>,
    },
    #[error("Column '{column}' has no paired TRUE/FALSE observations")]
    InsufficientData { column: String },
}

pub type AgreementResult<T> = Result<T, AgreementError>;

/// A fuzzy key match that cleared the floor but not the confidence threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchAmbiguity {
    pub row_a: usize,
    pub row_b: usize,
    pub key_a: String,
    pub key_b: String,
    pub score: f64,
}
