//! Canonical labels for rating cells.
//!
//! Raters write the same judgement many ways (`TRUE`, `yes`, `1`, a spreadsheet
//! boolean). [`normalize`] folds them onto a small closed label set so paired
//! cells can be compared for equality. Normalization is total and idempotent.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::value::CellValue;

const TRUE_TOKENS: &[&str] = &["TRUE", "YES", "1"];
const FALSE_TOKENS: &[&str] = &["FALSE", "NO", "0"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    True,
    False,
    /// Missing cell. Distinct from the text `"NULL"`, which becomes `Other("NULL")`.
    Null,
    Other(String),
}

impl Label {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Label::True => Some(true),
            Label::False => Some(false),
            _ => None,
        }
    }

    /// Text form of the label; `None` for the null sentinel.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::True => Some("TRUE"),
            Label::False => Some("FALSE"),
            Label::Null => None,
            Label::Other(text) => Some(text),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("NULL"))
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_none(),
        }
    }
}

pub fn normalize(cell: &CellValue) -> Label {
    match cell {
        CellValue::Bool(true) => Label::True,
        CellValue::Bool(false) => Label::False,
        other => match other.as_text() {
            Some(text) => normalize_text(&text),
            None => Label::Null,
        },
    }
}

pub fn normalize_text(text: &str) -> Label {
    let upper = text.trim().to_uppercase();
    if TRUE_TOKENS.contains(&upper.as_str()) {
        Label::True
    } else if FALSE_TOKENS.contains(&upper.as_str()) {
        Label::False
    } else {
        Label::Other(upper)
    }
}

/// Re-normalizes an existing label; the identity on every normalizer output.
pub fn renormalize(label: &Label) -> Label {
    match label.as_str() {
        Some(text) => normalize_text(text),
        None => Label::Null,
    }
}
