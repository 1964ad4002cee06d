use std::{io::Write, path::Path};

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    cli::{
        AlignArgs, CompareArgs, DisagreementsArgs, LocateArgs, MetricsArgs, OutputFormat,
        OverviewArgs, PairArgs,
    },
    config::CompareConfig,
    confusion::ConfusionMatrix,
    io_utils,
    matcher::{self, Alignment, MatchKind},
    metrics::{AgreementMetrics, Score},
    render,
    report::{self, ColumnReport, ColumnStatus, ComparisonReport, TableOverview},
    table::{LoadOptions, Table},
};

pub fn execute_overview(args: &OverviewArgs) -> Result<()> {
    let config = CompareConfig::default();
    let (left, right) = load_pair(&args.inputs, &config)?;
    let overview = TableOverview::of(&left, &right);
    info!(
        "{} common column(s), {} only in '{}', {} only in '{}'",
        overview.common_columns.len(),
        overview.only_in_a.len(),
        overview.table_a,
        overview.only_in_b.len(),
        overview.table_b
    );
    let mut writer = io_utils::open_text_writer(None)?;
    match args.format {
        OutputFormat::Json => write_json(&mut writer, &overview)?,
        OutputFormat::Table => write!(writer, "{}", render_overview(&overview))?,
    }
    writer.flush().context("Flushing overview output")
}

pub fn execute_compare(args: &CompareArgs) -> Result<()> {
    let config = resolve_config(&args.align)?;
    let alignment = resolve_alignment(&args.align, &config);
    let (left, right) = load_pair(&args.inputs, &config)?;

    let columns = requested_columns(&args.columns);
    let columns = if columns.is_empty() {
        let key = match &alignment {
            Alignment::ByKey(column) => Some(column.as_str()),
            Alignment::ByPosition => None,
        };
        report::common_columns(&left, &right, key)
    } else {
        columns
    };
    if columns.is_empty() {
        bail!("The tables share no columns to compare. Supply --columns to continue.");
    }
    debug!("Comparing columns {columns:?} using {alignment:?}");

    let report = report::compare(&left, &right, &columns, &alignment, &config)?;
    log_warnings(&report);
    info!(
        "Compared {} column(s) over {} matched row(s)",
        report.summary.columns_compared, report.rows.matched
    );

    let mut writer = io_utils::open_text_writer(args.output.as_deref())?;
    match args.format {
        OutputFormat::Json => write_json(&mut writer, &report)?,
        OutputFormat::Table => {
            write!(writer, "{}", render_report(&report, config.key_display_width))?
        }
    }
    writer.flush().context("Flushing comparison report")?;
    if let Some(path) = &args.output {
        info!("Report written to {path:?}");
    }
    Ok(())
}

pub fn execute_disagreements(args: &DisagreementsArgs) -> Result<()> {
    let config = resolve_config(&args.align)?;
    let alignment = resolve_alignment(&args.align, &config);
    let (left, right) = load_pair(&args.inputs, &config)?;

    let column = report::column_report(&left, &right, &args.column, &alignment, &config)?;
    info!(
        "{} disagreement(s) in '{}' across {} comparison(s)",
        column.tally.disagreements, column.column, column.tally.comparisons
    );

    match &args.output {
        Some(path) => write_disagreements_csv(&column, path),
        None => {
            let mut writer = io_utils::open_text_writer(None)?;
            write!(
                writer,
                "{}",
                render_disagreements(&column, config.key_display_width)
            )?;
            writer.flush().context("Flushing disagreement list")
        }
    }
}

pub fn execute_locate(args: &LocateArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => CompareConfig::load(path)?,
        None => CompareConfig::default(),
    };
    if let Some(key) = &args.key {
        config.key_column = key.clone();
    }
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding,
        null_tokens: &config.null_tokens,
    };
    let table = Table::from_path(&args.input, &options)?;
    let located = matcher::locate(&table, &args.title, &config.key_column, &config.matching)?;

    let mut writer = io_utils::open_text_writer(None)?;
    match located {
        Some(found) => {
            info!("Located '{}' at row {}", args.title, display_row(found.row));
            let matched = match found.kind {
                MatchKind::Exact => "exact".to_string(),
                MatchKind::Substring => "substring".to_string(),
                MatchKind::Fuzzy { score } => format!("fuzzy (score {score:.2})"),
                MatchKind::Position => "position".to_string(),
            };
            let pairs = [
                ("Row", display_row(found.row)),
                ("Column", found.column),
                ("Matched key", found.matched_key),
                ("Match", matched),
            ];
            write!(writer, "{}", render::render_pairs(&pairs))?;
        }
        None => writeln!(writer, "No row of {} matches '{}'", table.name(), args.title)?,
    }
    writer.flush().context("Flushing locate output")
}

pub fn execute_metrics(args: &MetricsArgs) -> Result<()> {
    let matrix = ConfusionMatrix::new(
        args.both_true,
        args.both_false,
        args.a_false_b_true,
        args.a_true_b_false,
    );
    let Some(metrics) = AgreementMetrics::compute(&matrix) else {
        bail!("The confusion matrix is empty; at least one observation is required");
    };
    let mut writer = io_utils::open_text_writer(None)?;
    match args.format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct MetricsOutput<'a> {
                confusion_matrix: &'a ConfusionMatrix,
                metrics: &'a AgreementMetrics,
            }
            write_json(
                &mut writer,
                &MetricsOutput {
                    confusion_matrix: &matrix,
                    metrics: &metrics,
                },
            )?
        }
        OutputFormat::Table => write!(writer, "{}", render_metrics(&metrics))?,
    }
    writer.flush().context("Flushing metrics output")
}

fn resolve_config(args: &AlignArgs) -> Result<CompareConfig> {
    let mut config = match &args.config {
        Some(path) => CompareConfig::load(path)?,
        None => CompareConfig::default(),
    };
    if let Some(key) = &args.key {
        config.key_column = key.clone();
    }
    debug!("Resolved comparison settings: {config:?}");
    Ok(config)
}

fn resolve_alignment(args: &AlignArgs, config: &CompareConfig) -> Alignment {
    if args.by_position {
        Alignment::ByPosition
    } else {
        Alignment::ByKey(config.key_column.clone())
    }
}

fn requested_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect()
}

fn load_pair(args: &PairArgs, config: &CompareConfig) -> Result<(Table, Table)> {
    if io_utils::is_dash(&args.left) && io_utils::is_dash(&args.right) {
        bail!("At most one of --left and --right may read from stdin");
    }
    let load = |path: &Path, encoding: Option<&str>| -> Result<Table> {
        let options = LoadOptions {
            delimiter: args.delimiter,
            encoding: io_utils::resolve_encoding(encoding)?,
            null_tokens: &config.null_tokens,
        };
        let table = Table::from_path(path, &options)?;
        info!(
            "Loaded {} row(s) and {} column(s) from {:?}",
            table.row_count(),
            table.columns().len(),
            path
        );
        Ok(table)
    };
    let left = load(&args.left, args.left_encoding.as_deref())?;
    let right = load(&args.right, args.right_encoding.as_deref())?;
    Ok((left, right))
}

fn log_warnings(report: &ComparisonReport) {
    for ambiguity in &report.ambiguities {
        warn!(
            "Uncertain match (score {:.2}): '{}' paired with '{}'",
            ambiguity.score, ambiguity.key_a, ambiguity.key_b
        );
    }
    for column in &report.columns {
        match (&column.status, &column.error) {
            (ColumnStatus::Failed, Some(error)) => warn!("Skipping column: {error}"),
            (ColumnStatus::NotComputable, Some(error)) => warn!("{error}"),
            _ => {}
        }
    }
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("Serializing JSON output")?;
    writeln!(writer)?;
    Ok(())
}

fn write_disagreements_csv(column: &ColumnReport, path: &Path) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(Some(path), io_utils::DEFAULT_CSV_DELIMITER)?;
    writer
        .write_record(["key", "row_a", "row_b", "value_a", "value_b", "category"])
        .context("Writing disagreement header")?;
    for item in &column.disagreements {
        writer
            .write_record([
                item.key.clone(),
                item.row_a.map(display_row).unwrap_or_default(),
                item.row_b.map(display_row).unwrap_or_default(),
                item.value_a.to_string(),
                item.value_b.to_string(),
                item.category.as_str().to_string(),
            ])
            .with_context(|| format!("Writing disagreement for '{}'", item.key))?;
    }
    writer.flush().with_context(|| format!("Flushing {path:?}"))?;
    info!(
        "Wrote {} disagreement(s) to {path:?}",
        column.disagreements.len()
    );
    Ok(())
}

/// One-based data row number, matching the `row N` keys of positional reports.
fn display_row(row: usize) -> String {
    (row + 1).to_string()
}

fn metric(value: f64) -> String {
    format!("{value:.4}")
}

fn rate(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        "(none)".to_string()
    } else {
        values.join(", ")
    }
}

fn render_overview(overview: &TableOverview) -> String {
    render::render_pairs(&[
        ("Table A", overview.table_a.clone()),
        ("Table B", overview.table_b.clone()),
        ("Rows in A", overview.rows_a.to_string()),
        ("Rows in B", overview.rows_b.to_string()),
        ("Row counts match", overview.row_count_match.to_string()),
        ("Common columns", list(&overview.common_columns)),
        ("Only in A", list(&overview.only_in_a)),
        ("Only in B", list(&overview.only_in_b)),
    ])
}

fn render_metrics(metrics: &AgreementMetrics) -> String {
    let scored = |score: &Score| format!("{} ({})", metric(score.value), score.band);
    render::render_pairs(&[
        ("Samples", metrics.samples.to_string()),
        ("Percent agreement", rate(Some(metrics.percent_agreement))),
        ("Expected agreement", metric(metrics.expected_agreement)),
        ("Cohen's Kappa", scored(&metrics.cohens_kappa)),
        ("Scott's Pi", scored(&metrics.scotts_pi)),
        ("Gwet's AC1", scored(&metrics.gwets_ac1)),
        ("Krippendorff's Alpha", scored(&metrics.krippendorff_alpha)),
        ("Recommendation", metrics.advice.clone()),
    ])
}

fn render_report(report: &ComparisonReport, key_width: usize) -> String {
    let mut output = String::new();
    let alignment = match &report.key_column {
        Some(key) => format!("matched on '{key}'"),
        None => "aligned by position".to_string(),
    };
    output.push_str(&format!(
        "{} vs {} ({alignment})\n",
        report.table_a, report.table_b
    ));
    output.push_str(&format!(
        "Rows: {} in A, {} in B, {} matched, {} unmatched in A, {} unmatched in B\n\n",
        report.rows.rows_a,
        report.rows.rows_b,
        report.rows.matched,
        report.rows.unmatched_a,
        report.rows.unmatched_b
    ));

    let headers = [
        "column", "status", "n", "agreement", "kappa", "pi", "ac1", "alpha", "band",
    ];
    let rows = report
        .columns
        .iter()
        .map(|column| {
            let mut row = vec![
                column.column.clone(),
                column.status.as_str().to_string(),
                column.tally.comparisons.to_string(),
                rate(column.tally.agreement_rate),
            ];
            match &column.metrics {
                Some(m) => row.extend([
                    metric(m.cohens_kappa.value),
                    metric(m.scotts_pi.value),
                    metric(m.gwets_ac1.value),
                    metric(m.krippendorff_alpha.value),
                    m.cohens_kappa.band.to_string(),
                ]),
                None => row.extend(std::iter::repeat_n("-".to_string(), 5)),
            }
            row
        })
        .collect::<Vec<_>>();
    output.push_str(&render::render_table(&headers, &rows, &[2, 3, 4, 5, 6, 7]));

    let summary = &report.summary;
    let average = match (summary.average_kappa, summary.average_kappa_band) {
        (Some(kappa), Some(band)) => format!("{} ({band})", metric(kappa)),
        _ => "n/a".to_string(),
    };
    output.push('\n');
    output.push_str(&render::render_pairs(&[
        ("Overall agreement", rate(summary.overall_agreement_rate)),
        ("Average Kappa", average),
        ("Perfect columns", list(&summary.perfect_columns)),
        (
            "Columns with disagreements",
            list(&summary.columns_with_disagreements),
        ),
    ]));

    for column in &report.columns {
        match (&column.metrics, &column.error) {
            (Some(m), _) => output.push_str(&format!("\n{}: {}\n", column.column, m.advice)),
            (None, Some(error)) => output.push_str(&format!("\n{}: {error}\n", column.column)),
            (None, None) => {}
        }
        if !column.disagreements.is_empty() {
            output.push_str(&render_disagreements(column, key_width));
        }
    }

    if !report.ambiguities.is_empty() {
        output.push_str("\nUncertain matches:\n");
        let rows = report
            .ambiguities
            .iter()
            .map(|a| {
                vec![
                    render::truncate(&a.key_a, key_width).into_owned(),
                    render::truncate(&a.key_b, key_width).into_owned(),
                    format!("{:.2}", a.score),
                ]
            })
            .collect::<Vec<_>>();
        output.push_str(&render::render_table(&["key_a", "key_b", "score"], &rows, &[2]));
    }
    for (label, keys) in [
        ("Unmatched in A", &report.unmatched_a_keys),
        ("Unmatched in B", &report.unmatched_b_keys),
    ] {
        if !keys.is_empty() {
            output.push_str(&format!("\n{label}:\n"));
            for key in keys {
                output.push_str(&format!("  {}\n", render::truncate(key, key_width)));
            }
        }
    }
    output
}

fn render_disagreements(column: &ColumnReport, key_width: usize) -> String {
    let summary = &column.disagreement_summary;
    let mut output = format!(
        "Disagreements in {} ({} A TRUE/B FALSE, {} A FALSE/B TRUE, {} other):\n",
        column.column, summary.a_true_b_false, summary.a_false_b_true, summary.other
    );
    let rows = column
        .disagreements
        .iter()
        .map(|d| {
            vec![
                render::truncate(&d.key, key_width).into_owned(),
                d.value_a.to_string(),
                d.value_b.to_string(),
                d.category.as_str().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    output.push_str(&render::render_table(
        &["key", "value_a", "value_b", "category"],
        &rows,
        &[],
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    fn screening(name: &str, rows: &[(&str, &str)]) -> Table {
        Table::from_records(
            name,
            rows.iter()
                .map(|(title, answer)| {
                    vec![
                        ("Title", CellValue::from(*title)),
                        ("Q1", CellValue::from(*answer)),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn text_report_rounds_for_display() {
        let a = screening("A", &[("X", "TRUE"), ("Y", "TRUE"), ("Z", "FALSE")]);
        let b = screening("B", &[("X", "TRUE"), ("Y", "FALSE"), ("Z", "FALSE")]);
        let report = report::compare(
            &a,
            &b,
            &["Q1".to_string()],
            &Alignment::ByKey("Title".into()),
            &CompareConfig::default(),
        )
        .unwrap();
        let text = render_report(&report, 50);
        assert!(text.contains("66.67%"));
        assert!(text.contains("0.4000"));
        assert!(text.contains("Disagreements in Q1 (1 A TRUE/B FALSE"));
        assert!(text.contains("a_true_b_false"));
    }

    #[test]
    fn long_keys_are_truncated_in_disagreement_lists() {
        let title = "A very long paper title that keeps going well past the display width";
        let a = screening("A", &[(title, "TRUE")]);
        let b = screening("B", &[(title, "FALSE")]);
        let column = report::column_report(
            &a,
            &b,
            "Q1",
            &Alignment::ByKey("Title".into()),
            &CompareConfig::default(),
        )
        .unwrap();
        let text = render_disagreements(&column, 20);
        assert!(text.contains("A very long paper..."));
        assert!(!text.contains(title));
    }

    #[test]
    fn metrics_block_lists_every_coefficient() {
        let metrics = AgreementMetrics::compute(&ConfusionMatrix::new(20, 15, 5, 10)).unwrap();
        let text = render_metrics(&metrics);
        for label in [
            "Cohen's Kappa",
            "Scott's Pi",
            "Gwet's AC1",
            "Krippendorff's Alpha",
        ] {
            assert!(text.contains(label), "missing {label}");
        }
        assert!(text.contains("70.00%"));
        assert!(text.contains("0.4000 (Fair)"));
    }
}
