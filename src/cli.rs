use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Measure inter-rater agreement between two screening tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the columns and row counts of two tables side by side
    Overview(OverviewArgs),
    /// Compare two tables column by column and report agreement metrics
    Compare(CompareArgs),
    /// List the rows on which two tables disagree for one column
    Disagreements(DisagreementsArgs),
    /// Find the row of a table whose title best matches a query
    Locate(LocateArgs),
    /// Compute agreement metrics from the four cells of a 2x2 confusion matrix
    Metrics(MetricsArgs),
}

/// Inputs shared by every command that reads two tables.
#[derive(Debug, Args)]
pub struct PairArgs {
    /// Table produced by the first rater (CSV, TSV or JSON records; '-' for stdin)
    #[arg(short = 'l', long = "left")]
    pub left: PathBuf,
    /// Table produced by the second rater
    #[arg(short = 'r', long = "right")]
    pub right: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the left table (defaults to utf-8)
    #[arg(long = "left-encoding")]
    pub left_encoding: Option<String>,
    /// Character encoding of the right table (defaults to utf-8)
    #[arg(long = "right-encoding")]
    pub right_encoding: Option<String>,
}

/// How rows of the two tables are paired.
#[derive(Debug, Args)]
pub struct AlignArgs {
    /// Column used to match rows across tables (defaults to the configured key, "Title")
    #[arg(short = 'k', long = "key", conflicts_with = "by_position")]
    pub key: Option<String>,
    /// Pair rows by their position instead of a key column
    #[arg(long = "by-position")]
    pub by_position: bool,
    /// YAML file with matching thresholds, null tokens and display settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub inputs: PairArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub inputs: PairArgs,
    #[command(flatten)]
    pub align: AlignArgs,
    /// Columns to compare (defaults to every column common to both tables except the key)
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Write the report to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DisagreementsArgs {
    #[command(flatten)]
    pub inputs: PairArgs,
    #[command(flatten)]
    pub align: AlignArgs,
    /// Column whose disagreements are listed
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Write the disagreements as CSV to this file instead of printing a table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Table to search
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Title to look up
    #[arg(short = 't', long = "title")]
    pub title: String,
    /// Column holding titles; falls back to the first column whose name contains "title"
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file with matching thresholds and null tokens
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// Observations both raters marked TRUE
    #[arg(long = "both-true")]
    pub both_true: usize,
    /// Observations both raters marked FALSE
    #[arg(long = "both-false")]
    pub both_false: usize,
    /// Observations the first rater marked FALSE and the second TRUE
    #[arg(long = "a-false-b-true")]
    pub a_false_b_true: usize,
    /// Observations the first rater marked TRUE and the second FALSE
    #[arg(long = "a-true-b-false")]
    pub a_true_b_false: usize,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_delimiters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn key_conflicts_with_positional_alignment() {
        let parsed = Cli::try_parse_from([
            "review-agreement",
            "compare",
            "--left",
            "a.csv",
            "--right",
            "b.csv",
            "--key",
            "Title",
            "--by-position",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn splits_column_list() {
        let cli = Cli::try_parse_from([
            "review-agreement",
            "compare",
            "-l",
            "a.csv",
            "-r",
            "b.csv",
            "-C",
            "Q1,Q2",
            "--format",
            "json",
        ])
        .expect("valid arguments");
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.columns, vec!["Q1".to_string(), "Q2".to_string()]);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.align.key.is_none());
    }
}
