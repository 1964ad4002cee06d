//! Comparison settings, loadable from YAML.
//!
//! ```yaml
//! key_column: Title
//! matching:
//!   fuzzy_floor: 0.5
//!   confident_score: 0.8
//! key_display_width: 50
//! ```
//!
//! Every field is optional; omitted fields keep their defaults.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::value::DEFAULT_NULL_TOKENS;

pub const DEFAULT_KEY_COLUMN: &str = "Title";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchOptions {
    /// Minimum token-overlap score for a fuzzy key match.
    pub fuzzy_floor: f64,
    /// Fuzzy matches scoring below this are reported as ambiguous.
    pub confident_score: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            fuzzy_floor: 0.5,
            confident_score: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    pub key_column: String,
    pub matching: MatchOptions,
    /// Cell texts read as missing values when loading delimited files.
    pub null_tokens: Vec<String>,
    /// Maximum key length shown in text reports.
    pub key_display_width: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            matching: MatchOptions::default(),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
            key_display_width: 50,
        }
    }
}

impl CompareConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: CompareConfig =
            serde_yaml::from_reader(BufReader::new(file)).context("Parsing config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: CompareConfig = serde_yaml::from_str(yaml).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let floor = self.matching.fuzzy_floor;
        let confident = self.matching.confident_score;
        ensure!(
            floor > 0.0 && floor <= 1.0,
            "matching.fuzzy_floor must be in (0, 1], got {floor}"
        );
        ensure!(
            confident >= floor && confident <= 1.0,
            "matching.confident_score must be between fuzzy_floor ({floor}) and 1, got {confident}"
        );
        ensure!(
            self.key_display_width > 0,
            "key_display_width must be greater than zero"
        );
        ensure!(
            !self.key_column.trim().is_empty(),
            "key_column must not be empty"
        );
        Ok(())
    }
}
