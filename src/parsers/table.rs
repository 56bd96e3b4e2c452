// ==============================================================================
// table.rs - Sample-Indexed Table Parser
// ==============================================================================
// Description: Reads computed score and phenotype files indexed by sample ID
// Author: Matt Barham
// Created: 2026-09-16
// Modified: 2026-10-18
// Version: 1.2.0
// ==============================================================================
// Format: Delimited text with header, one row per sample
// Example (computed scores):
//   sample,grs
//   samp1,0.365
//   samp2,-0.300
// Cells are kept as text; coercion happens when a column is used.
// ==============================================================================

use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::models::{ComputedScoreTable, SampleTable, TableError};
use crate::parsers::source::open_source;
use crate::parsers::MISSING_VALUE_TOKENS;

/// Index column of computed score files
pub const SCORE_SAMPLE_COLUMN: &str = "sample";

/// Reader for delimited tables indexed by a sample column
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTableReader {
    /// Header of the sample identifier column
    pub sample_column: String,

    /// Field delimiter
    pub delimiter: u8,

    /// Cells read as missing values
    pub missing_values: Vec<String>,
}

impl SampleTableReader {
    /// Comma-delimited reader; empty cells, `NA`, `NaN` and `nan` are missing
    pub fn new(sample_column: impl Into<String>) -> Self {
        Self {
            sample_column: sample_column.into(),
            delimiter: b',',
            missing_values: MISSING_VALUE_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn missing_values(mut self, tokens: Vec<String>) -> Self {
        self.missing_values = tokens;
        self
    }

    /// Read a table from a file (`.gz` is decompressed)
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<SampleTable, TableError> {
        let path = path.as_ref();
        let table = self.read(open_source(path)?)?;
        debug!(
            "Loaded {} samples x {} columns from {:?}",
            table.len(),
            table.columns.len(),
            path
        );
        Ok(table)
    }

    /// Read a table from any reader
    pub fn read<R: Read>(&self, reader: R) -> Result<SampleTable, TableError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(TableError::EmptyFile);
        }

        let sample_idx = headers
            .iter()
            .position(|h| h == self.sample_column)
            .ok_or_else(|| TableError::MissingSampleColumn(self.sample_column.clone()))?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != sample_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut samples = Vec::new();
        let mut rows = Vec::new();
        let mut seen = HashSet::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let sample = record.get(sample_idx).unwrap_or("");
            if self.is_missing(sample) {
                return Err(TableError::MissingSampleId(line));
            }
            if !seen.insert(sample.to_string()) {
                return Err(TableError::DuplicateSample {
                    sample: sample.to_string(),
                    line,
                });
            }

            let row: Vec<Option<String>> = record
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != sample_idx)
                .map(|(_, cell)| {
                    if self.is_missing(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();

            samples.push(sample.to_string());
            rows.push(row);
        }

        Ok(SampleTable {
            index_name: self.sample_column.clone(),
            columns,
            samples,
            rows,
        })
    }

    fn is_missing(&self, cell: &str) -> bool {
        self.missing_values.iter().any(|token| token == cell)
    }
}

/// Parse a computed GRS file (comma-delimited, indexed by `sample`)
///
/// No coercion or filtering is applied: the file is trusted to come from
/// the score computation step.
pub fn parse_computed_grs_file(path: impl AsRef<Path>) -> Result<ComputedScoreTable, TableError> {
    SampleTableReader::new(SCORE_SAMPLE_COLUMN).read_path(path)
}
