//! Eager CSV reading into typed rows
//!
//! Missing values (blank cells, `nan`, absent columns) are resolved once here,
//! so the resolvers only ever see `Option<&str>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::parse::is_missing;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// File-level read failure; aborts the file, never the batch
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is not valid UTF-8 (byte {0})")]
    Encoding(usize),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("file has no header row")]
    MissingHeader,
}

/// Where the bytes of a file live; in-memory content only backs tests
#[derive(Debug, Clone)]
enum SourceData {
    #[cfg(test)]
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// One input file of a batch
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub filename: String,
    data: SourceData,
}

impl CsvSource {
    #[cfg(test)]
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data: SourceData::Bytes(bytes),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            filename,
            data: SourceData::Path(path),
        }
    }

    /// Read and parse the whole file
    pub fn read(&self) -> Result<CsvTable, ReadError> {
        match &self.data {
            #[cfg(test)]
            SourceData::Bytes(bytes) => CsvTable::parse(bytes),
            SourceData::Path(path) => CsvTable::parse(&std::fs::read(path)?),
        }
    }
}

/// Collect the `.csv` files of a directory, sorted by name
pub fn sources_from_dir(dir: &Path) -> std::io::Result<Vec<CsvSource>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_csv_extension(&path.to_string_lossy()) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths.into_iter().map(CsvSource::from_path).collect())
}

/// Case-insensitive `.csv` extension check
pub fn has_csv_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".csv")
}

/// A fully read file
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

impl CsvTable {
    pub fn parse(bytes: &[u8]) -> Result<Self, ReadError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|e| ReadError::Encoding(e.valid_up_to()))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(text))
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ReadError::MissingHeader);
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let values: HashMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, value)| !header.is_empty() && !is_missing(value))
                .map(|(header, value)| (header.clone(), value.trim().to_string()))
                .collect();
            if values.is_empty() {
                continue;
            }
            // Header is line 1
            rows.push(CsvRow { line: index + 2, values });
        }

        Ok(Self { headers, rows })
    }
}

/// `;` when the header line has more semicolons than commas
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// One data row with missing cells removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRow {
    pub line: usize,
    values: HashMap<String, String>,
}

impl CsvRow {
    /// Value of a column, `None` when absent or blank
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            line: 2,
            values: pairs
                .iter()
                .filter(|(_, value)| !is_missing(value))
                .map(|(column, value)| (column.to_string(), value.trim().to_string()))
                .collect(),
        }
    }
}
