//! Chance-corrected agreement statistics for two raters.
//!
//! Everything here is computed from a [`ConfusionMatrix`] with the naming
//! `tp = both_true`, `tn = both_false`, `fp = a_false_b_true`,
//! `fn = a_true_b_false`. Rater A's marginals are `(tp+fn)` / `(tn+fp)`,
//! rater B's are `(tp+fp)` / `(tn+fn)`.
//!
//! Gwet's AC1 and Krippendorff's Alpha use the simplified two-coder binary
//! forms below, not the general multi-category estimators. Reports produced
//! by earlier screening runs used the same forms, so they must not drift.

use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};

use crate::{confusion::ConfusionMatrix, normalize::Label};

pub const PARADOX_MIN_AGREEMENT: f64 = 0.80;
pub const PARADOX_MAX_KAPPA: f64 = 0.40;
pub const PREVALENCE_HIGH: f64 = 0.9;
pub const PREVALENCE_LOW: f64 = 0.1;

/// Landis & Koch style interpretation band shared by all chance-corrected metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    Poor,
    Slight,
    Fair,
    Moderate,
    Substantial,
    AlmostPerfect,
}

impl Band {
    pub fn of(value: f64) -> Self {
        if value >= 0.81 {
            Band::AlmostPerfect
        } else if value >= 0.61 {
            Band::Substantial
        } else if value >= 0.41 {
            Band::Moderate
        } else if value >= 0.21 {
            Band::Fair
        } else if value >= 0.0 {
            Band::Slight
        } else {
            Band::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::AlmostPerfect => "Almost Perfect",
            Band::Substantial => "Substantial",
            Band::Moderate => "Moderate",
            Band::Fair => "Fair",
            Band::Slight => "Slight",
            Band::Poor => "Poor",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Band {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub value: f64,
    pub band: Band,
}

impl Score {
    fn new(value: f64) -> Self {
        Self {
            value,
            band: Band::of(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// High raw agreement with a low Kappa; AC1 reads the data better.
    KappaParadox { observed: f64, kappa: f64, ac1: f64 },
    /// Rater A's positive rate is above 90% or below 10%.
    PrevalenceImbalance { prevalence: f64 },
    KappaAppropriate,
}

impl Recommendation {
    pub fn assess(matrix: &ConfusionMatrix, kappa: f64, ac1: f64) -> Self {
        let n = matrix.total() as f64;
        let observed = matrix.agreements() as f64 / n;
        let prevalence = (matrix.both_true + matrix.a_true_b_false) as f64 / n;
        if observed > PARADOX_MIN_AGREEMENT && kappa < PARADOX_MAX_KAPPA {
            Recommendation::KappaParadox {
                observed,
                kappa,
                ac1,
            }
        } else if prevalence > PREVALENCE_HIGH || prevalence < PREVALENCE_LOW {
            Recommendation::PrevalenceImbalance { prevalence }
        } else {
            Recommendation::KappaAppropriate
        }
    }

    pub fn suggests_ac1(&self) -> bool {
        !matches!(self, Recommendation::KappaAppropriate)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::KappaParadox {
                observed,
                kappa,
                ac1,
            } => write!(
                f,
                "Kappa Paradox detected: high agreement ({:.1}%) but low Kappa ({kappa:.2}). \
                 Use Gwet's AC1 ({ac1:.2}) for a better interpretation.",
                observed * 100.0
            ),
            Recommendation::PrevalenceImbalance { prevalence } => write!(
                f,
                "High prevalence imbalance ({:.1}% positive). Consider Gwet's AC1 alongside Kappa.",
                prevalence * 100.0
            ),
            Recommendation::KappaAppropriate => {
                f.write_str("Cohen's Kappa is appropriate for this data distribution.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementMetrics {
    pub samples: usize,
    /// Observed agreement as a percentage (0–100).
    pub percent_agreement: f64,
    /// Cohen's expected-by-chance agreement as a proportion.
    pub expected_agreement: f64,
    pub cohens_kappa: Score,
    pub scotts_pi: Score,
    pub gwets_ac1: Score,
    pub krippendorff_alpha: Score,
    pub recommendation: Recommendation,
    pub advice: String,
}

impl AgreementMetrics {
    /// Returns `None` when the matrix is empty.
    pub fn compute(matrix: &ConfusionMatrix) -> Option<Self> {
        if matrix.is_empty() {
            return None;
        }
        let tp = matrix.both_true as f64;
        let tn = matrix.both_false as f64;
        let fp = matrix.a_false_b_true as f64;
        let fn_ = matrix.a_true_b_false as f64;
        let n = matrix.total() as f64;

        let po = (tp + tn) / n;

        let p1_yes = (tp + fn_) / n;
        let p2_yes = (tp + fp) / n;
        let p1_no = (tn + fp) / n;
        let p2_no = (tn + fn_) / n;
        let pe_kappa = p1_yes * p2_yes + p1_no * p2_no;
        let kappa = chance_corrected(po, pe_kappa);

        let p_yes = (p1_yes + p2_yes) / 2.0;
        let p_no = (p1_no + p2_no) / 2.0;
        let pe_scott = p_yes.powi(2) + p_no.powi(2);
        let pi = chance_corrected(po, pe_scott);

        let p_avg = (p_yes + (1.0 - p_no)) / 2.0;
        let pe_gwet = 2.0 * p_avg * (1.0 - p_avg);
        let ac1 = chance_corrected(po, pe_gwet);

        let alpha = krippendorff_alpha(matrix);

        let recommendation = Recommendation::assess(matrix, kappa, ac1);
        Some(Self {
            samples: matrix.total(),
            percent_agreement: po * 100.0,
            expected_agreement: pe_kappa,
            cohens_kappa: Score::new(kappa),
            scotts_pi: Score::new(pi),
            gwets_ac1: Score::new(ac1),
            krippendorff_alpha: Score::new(alpha),
            recommendation,
            advice: recommendation.to_string(),
        })
    }
}

fn chance_corrected(observed: f64, expected: f64) -> f64 {
    if expected >= 1.0 {
        1.0
    } else {
        (observed - expected) / (1.0 - expected)
    }
}

fn krippendorff_alpha(matrix: &ConfusionMatrix) -> f64 {
    let n = matrix.total() as f64;
    let disagreements = (matrix.a_false_b_true + matrix.a_true_b_false) as f64;
    let observed = disagreements / n;
    let n_yes = (2 * matrix.both_true + matrix.a_true_b_false + matrix.a_false_b_true) as f64;
    let n_no = (2 * matrix.both_false + matrix.a_false_b_true + matrix.a_true_b_false) as f64;
    let expected = if matrix.total() > 1 {
        n_yes * n_no / (n * (2.0 * n - 1.0))
    } else {
        0.0
    };
    if expected != 0.0 {
        1.0 - observed / expected
    } else {
        1.0
    }
}

/// Cohen's Kappa over arbitrary categories; `None` for an empty slice.
///
/// When chance agreement is total (`pe = 1`) the result is `1.0` for perfect
/// observed agreement and `0.0` otherwise.
pub fn categorical_kappa(pairs: &[(Label, Label)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let n = pairs.len() as f64;
    let mut marginals: BTreeMap<&Label, (usize, usize)> = BTreeMap::new();
    let mut agreements = 0usize;
    for (a, b) in pairs {
        marginals.entry(a).or_default().0 += 1;
        marginals.entry(b).or_default().1 += 1;
        if a == b {
            agreements += 1;
        }
    }
    let observed = agreements as f64 / n;
    let expected = marginals
        .values()
        .map(|(count_a, count_b)| (*count_a as f64 / n) * (*count_b as f64 / n))
        .sum::<f64>();
    if expected >= 1.0 {
        return Some(if observed >= 1.0 { 1.0 } else { 0.0 });
    }
    Some((observed - expected) / (1.0 - expected))
}
