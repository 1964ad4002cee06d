//! 2×2 contingency tallies for binary rating columns.

use serde::Serialize;

use crate::normalize::Label;

/// One side of a paired observation: a label, or no partner row at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Observed {
    Label(Label),
    NotFound,
}

impl Observed {
    pub fn label(&self) -> Option<&Label> {
        match self {
            Observed::Label(label) => Some(label),
            Observed::NotFound => None,
        }
    }
}

impl std::fmt::Display for Observed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Observed::Label(label) => label.fmt(f),
            Observed::NotFound => f.write_str("NOT_FOUND"),
        }
    }
}

impl Serialize for Observed {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Observed::Label(label) => label.serialize(serializer),
            Observed::NotFound => serializer.serialize_str("NOT_FOUND"),
        }
    }
}

impl From<Label> for Observed {
    fn from(label: Label) -> Self {
        Observed::Label(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub both_true: usize,
    pub both_false: usize,
    pub a_false_b_true: usize,
    pub a_true_b_false: usize,
}

/// Observations kept out of the binary tally, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Exclusions {
    /// The row found no partner in the other table.
    pub not_found: usize,
    /// At least one side was an empty cell.
    pub missing: usize,
    /// Both sides present, at least one outside TRUE/FALSE.
    pub non_binary: usize,
}

impl Exclusions {
    pub fn total(&self) -> usize {
        self.not_found + self.missing + self.non_binary
    }
}

impl ConfusionMatrix {
    pub fn new(
        both_true: usize,
        both_false: usize,
        a_false_b_true: usize,
        a_true_b_false: usize,
    ) -> Self {
        Self {
            both_true,
            both_false,
            a_false_b_true,
            a_true_b_false,
        }
    }

    /// Tallies binary pairs and counts everything else in [`Exclusions`].
    pub fn from_pairs<'a, I>(pairs: I) -> (Self, Exclusions)
    where
        I: IntoIterator<Item = (&'a Observed, &'a Observed)>,
    {
        let mut matrix = ConfusionMatrix::default();
        let mut excluded = Exclusions::default();
        for (a, b) in pairs {
            let (a, b) = match (a, b) {
                (_, Observed::NotFound) | (Observed::NotFound, _) => {
                    excluded.not_found += 1;
                    continue;
                }
                (Observed::Label(a), Observed::Label(b)) => (a, b),
            };
            match (a.as_bool(), b.as_bool()) {
                (Some(a), Some(b)) => matrix.record(a, b),
                _ if *a == Label::Null || *b == Label::Null => excluded.missing += 1,
                _ => excluded.non_binary += 1,
            }
        }
        (matrix, excluded)
    }

    pub fn record(&mut self, a: bool, b: bool) {
        match (a, b) {
            (true, true) => self.both_true += 1,
            (false, false) => self.both_false += 1,
            (false, true) => self.a_false_b_true += 1,
            (true, false) => self.a_true_b_false += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.both_true + self.both_false + self.a_false_b_true + self.a_true_b_false
    }

    pub fn agreements(&self) -> usize {
        self.both_true + self.both_false
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
