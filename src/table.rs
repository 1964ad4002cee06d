//! In-memory rating tables.
//!
//! A [`Table`] is an ordered list of rows under unique column names. Cells are
//! [`CellValue`]s; rows shorter than the header read their missing cells as
//! null. Tables are loaded from delimited text or JSON record arrays and are
//! never mutated by the comparison engine.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    io_utils::{self, InputFormat},
    value::CellValue,
};

static NULL_CELL: CellValue = CellValue::Null;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// Options controlling how a table source is read.
#[derive(Debug, Clone)]
pub struct LoadOptions<'a> {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub null_tokens: &'a [String],
}

impl Table {
    pub fn new<S: Into<String>>(name: S, columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                bail!("Duplicate column '{column}'");
            }
        }
        Ok(Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        })
    }

    /// Builds a table from `(column, cell)` records; columns appear in first-seen order.
    pub fn from_records<S, K, V, R>(name: S, records: R) -> Self
    where
        S: Into<String>,
        K: Into<String>,
        V: Into<CellValue>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = (K, V)>,
    {
        let mut table = Table {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        };
        for record in records {
            let mut row = vec![CellValue::Null; table.columns.len()];
            for (column, value) in record {
                let column = column.into();
                let idx = match table.column_index(&column) {
                    Some(idx) => idx,
                    None => {
                        table.columns.push(column);
                        row.push(CellValue::Null);
                        table.columns.len() - 1
                    }
                };
                row[idx] = value.into();
            }
            table.rows.push(row);
        }
        table
    }

    pub fn push_row(&mut self, mut cells: Vec<CellValue>) -> Result<()> {
        if cells.len() > self.columns.len() {
            bail!(
                "Row has {} cell(s) but table '{}' has {} column(s)",
                cells.len(),
                self.name,
                self.columns.len()
            );
        }
        cells.resize(self.columns.len(), CellValue::Null);
        self.rows.push(cells);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row`/`column`; out-of-range positions read as null.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&NULL_CELL)
    }

    pub fn column_cells(&self, column: usize) -> impl Iterator<Item = &CellValue> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, column))
    }

    pub fn from_path(path: &Path, options: &LoadOptions<'_>) -> Result<Self> {
        let name = path.display().to_string();
        match io_utils::resolve_input_format(path, options.delimiter) {
            InputFormat::JsonRecords => {
                let reader = io_utils::open_input(path)?;
                Self::from_json_reader(name, reader)
                    .with_context(|| format!("Reading JSON records from {path:?}"))
            }
            InputFormat::Delimited(delimiter) => {
                let reader = io_utils::open_input(path)?;
                Self::from_delimited_reader(name, reader, delimiter, options)
                    .with_context(|| format!("Reading table from {path:?}"))
            }
        }
    }

    pub fn from_delimited_reader<R: std::io::Read>(
        name: String,
        reader: R,
        delimiter: u8,
        options: &LoadOptions<'_>,
    ) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader(reader, delimiter);
        let headers = io_utils::reader_headers(&mut reader, options.encoding)?
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect::<Vec<_>>();
        let mut table = Table::new(name, headers)?;
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, options.encoding)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?;
            if decoded.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let cells = decoded
                .iter()
                .map(|raw| CellValue::from_raw(raw, options.null_tokens))
                .collect::<Vec<_>>();
            table
                .push_row(cells)
                .with_context(|| format!("Row {}", row_idx + 2))?;
        }
        debug!(
            "Loaded {} row(s) across {} column(s) from {}",
            table.row_count(),
            table.columns.len(),
            table.name
        );
        Ok(table)
    }

    pub fn from_json_reader<R: std::io::Read>(name: String, reader: R) -> Result<Self> {
        let parsed: serde_json::Value =
            serde_json::from_reader(reader).context("Parsing JSON document")?;
        let records = parsed
            .as_array()
            .ok_or_else(|| anyhow!("Expected a JSON array of records"))?;
        let mut rows = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or_else(|| anyhow!("Record {} is not a JSON object", idx + 1))?;
            rows.push(
                object
                    .iter()
                    .map(|(column, value)| (column.clone(), CellValue::from_json(value)))
                    .collect::<Vec<_>>(),
            );
        }
        Ok(Table::from_records(name, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DEFAULT_NULL_TOKENS;
    use encoding_rs::UTF_8;

    fn null_tokens() -> Vec<String> {
        DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn from_records_unions_columns_in_first_seen_order() {
        let table = Table::from_records(
            "a",
            vec![
                vec![("Title", CellValue::from("X")), ("Q1", CellValue::from(true))],
                vec![("Title", CellValue::from("Y")), ("Q2", CellValue::from("no"))],
            ],
        );
        assert_eq!(table.columns(), ["Title", "Q1", "Q2"]);
        assert_eq!(table.cell(0, 2), &CellValue::Null);
        assert_eq!(table.cell(1, 1), &CellValue::Null);
        assert_eq!(table.cell(1, 2), &CellValue::from("no"));
        assert_eq!(table.cell(9, 0), &CellValue::Null);
    }

    #[test]
    fn delimited_reader_pads_short_rows_and_skips_blank_lines() {
        let tokens = null_tokens();
        let options = LoadOptions {
            delimiter: None,
            encoding: UTF_8,
            null_tokens: &tokens,
        };
        let data = "Title,Q1,Q2\nPaper A,TRUE\n,,\nPaper B,no,NA\n";
        let table =
            Table::from_delimited_reader("t".into(), data.as_bytes(), b',', &options).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 1), &CellValue::Bool(true));
        assert_eq!(table.cell(0, 2), &CellValue::Null);
        assert_eq!(table.cell(1, 2), &CellValue::Null);
    }

    #[test]
    fn delimited_reader_rejects_duplicate_headers() {
        let tokens = null_tokens();
        let options = LoadOptions {
            delimiter: None,
            encoding: UTF_8,
            null_tokens: &tokens,
        };
        let err = Table::from_delimited_reader("t".into(), "a,a\n1,2\n".as_bytes(), b',', &options)
            .expect_err("duplicate header");
        assert!(err.to_string().contains("Duplicate column 'a'"));
    }

    #[test]
    fn json_reader_requires_array_of_objects() {
        let table = Table::from_json_reader(
            "j".into(),
            r#"[{"Title":"X","Q1":true},{"Title":"Y","Q1":null}]"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(table.columns(), ["Title", "Q1"]);
        assert_eq!(table.cell(1, 1), &CellValue::Null);
        assert!(Table::from_json_reader("j".into(), "{}".as_bytes()).is_err());
        assert!(Table::from_json_reader("j".into(), "[1]".as_bytes()).is_err());
    }
}
