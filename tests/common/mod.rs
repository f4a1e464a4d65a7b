#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use squad_reconcile::dataset::{Dataset, Table};
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

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// Builds an in-memory table from string literals.
pub fn table(label: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::from_rows(
        label,
        &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
        "N/a",
    )
}

/// Column `field` rendered with the default missing marker.
pub fn column(data: &Dataset, field: &str) -> Vec<String> {
    data.column(field)
        .expect("column present")
        .into_iter()
        .map(|value| value.as_display("N/a"))
        .collect()
}

/// Parses CSV text (optionally BOM-prefixed) into header and rows.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let raw = std::fs::read_to_string(path).expect("read csv output");
    let text = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.expect("record").iter().map(String::from).collect())
        .collect();
    (headers, rows)
}
