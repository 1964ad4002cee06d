#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use review_agreement::{Table, value::CellValue};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Builds a table with a `Title` column followed by `columns`, one row per entry of `rows`.
pub fn screening_table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
    let header = std::iter::once("Title")
        .chain(columns.iter().copied())
        .map(String::from)
        .collect::<Vec<_>>();
    let mut table = Table::new(name, header).expect("unique columns");
    for row in rows {
        let cells = row
            .iter()
            .map(|raw| CellValue::from_raw(raw, &["", "NA"]))
            .collect();
        table.push_row(cells).expect("row fits the header");
    }
    table
}
