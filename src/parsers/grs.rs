// ==============================================================================
// grs.rs - GRS Definition File Parser
// ==============================================================================
// Description: Schema-validated parsing and threshold filtering of GRS files
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-10-12
// Version: 1.2.0
// ==============================================================================
// Format: Delimited text with header (comma by default)
// Example:
//   name,chrom,pos,reference,risk,p-value,effect,maf
//   rs1234,1,1000,a,G,1e-8,0.12,0.31
//   rs5678,X,2000,C,t,0.004,-0.08,0.12
// Mandatory columns: name, chrom, pos, reference, risk, p-value, effect
// Optional columns: maf (enables MAF filtering)
// Any other column is dropped.
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, Trim};
use std::fmt;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::models::{VariantRecord, VariantTable};
use crate::parsers::source::open_source;
use crate::parsers::MISSING_VALUE_TOKENS;

/// Mandatory columns, in canonical order
pub const MANDATORY_COLUMNS: [&str; 7] =
    ["name", "chrom", "pos", "reference", "risk", "p-value", "effect"];

/// Optional minor allele frequency column
pub const MAF_COLUMN: &str = "maf";

/// A single cell that could not be coerced to its column type
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionFailure {
    /// Line in the source file (header is line 1)
    pub line: u64,
    pub column: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column '{}': '{}' is not a valid {}",
            self.line, self.column, self.value, self.expected
        )
    }
}

fn summarize_failures(failures: &[CoercionFailure]) -> String {
    let shown: Vec<String> = failures.iter().take(5).map(|f| f.to_string()).collect();
    let mut summary = shown.join("; ");
    if failures.len() > shown.len() {
        summary.push_str(&format!(" (and {} more)", failures.len() - shown.len()));
    }
    summary
}

/// Errors that can occur during GRS file parsing
#[derive(Error, Debug)]
pub enum GrsParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing mandatory column(s): {}", .missing.join(", "))]
    SchemaViolation { missing: Vec<String> },

    #[error("{} value(s) could not be coerced: {}", .failures.len(), summarize_failures(.failures))]
    TypeMismatch { failures: Vec<CoercionFailure> },
}

/// Column positions resolved from the header
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    name: usize,
    chrom: usize,
    pos: usize,
    reference: usize,
    risk: usize,
    p_value: usize,
    effect: usize,
    maf: Option<usize>,
}

impl ColumnLayout {
    /// Project the header onto the schema; every missing column is reported
    fn from_headers(headers: &StringRecord) -> Result<Self, GrsParseError> {
        let find = |column: &str| headers.iter().position(|h| h == column);

        let missing: Vec<String> = MANDATORY_COLUMNS
            .iter()
            .filter(|&&column| find(column).is_none())
            .map(|column| column.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(GrsParseError::SchemaViolation { missing });
        }

        let [name, chrom, pos, reference, risk, p_value, effect] =
            MANDATORY_COLUMNS.map(|column| find(column).unwrap_or_default());

        Ok(Self {
            name,
            chrom,
            pos,
            reference,
            risk,
            p_value,
            effect,
            maf: find(MAF_COLUMN),
        })
    }
}

/// Uppercase an allele; applying it twice changes nothing
pub fn normalize_allele(allele: &str) -> String {
    allele.to_uppercase()
}

fn parse_float(raw: &str) -> Option<f64> {
    if MISSING_VALUE_TOKENS.contains(&raw) {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}

/// GRS definition file parser with inclusion thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct GrsParser {
    /// Inclusive upper bound on p-value
    pub p_threshold: f64,

    /// Inclusive lower bound on MAF (only applied when a `maf` column exists)
    pub maf_threshold: f64,

    /// Field delimiter
    pub delimiter: u8,

    /// Emit threshold diagnostics
    pub verbose: bool,
}

impl Default for GrsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl GrsParser {
    /// Parser that admits every variant (p <= 1, MAF >= 0, comma-delimited)
    pub fn new() -> Self {
        Self {
            p_threshold: 1.0,
            maf_threshold: 0.0,
            delimiter: b',',
            verbose: false,
        }
    }

    /// Create a parser with specific thresholds
    pub fn with_thresholds(p_threshold: f64, maf_threshold: f64) -> Self {
        Self {
            p_threshold,
            maf_threshold,
            ..Self::new()
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Parse a GRS file, sending diagnostics to `tracing`
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<VariantTable, GrsParseError> {
        self.parse_with(path, &TracingDiagnostics)
    }

    /// Parse a GRS file, sending diagnostics to `diagnostics`
    pub fn parse_with(
        &self,
        path: impl AsRef<Path>,
        diagnostics: &dyn Diagnostics,
    ) -> Result<VariantTable, GrsParseError> {
        let source = open_source(path.as_ref())?;
        self.parse_reader(source, diagnostics)
    }

    /// Parse a GRS table from any reader
    ///
    /// # Returns
    /// * `Ok(VariantTable)` - Variants passing both thresholds, in input order
    /// * `Err(GrsParseError::SchemaViolation)` - A mandatory column is missing
    /// * `Err(GrsParseError::TypeMismatch)` - One or more cells failed coercion
    ///
    /// Nothing is returned unless the whole table projects onto the schema.
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        diagnostics: &dyn Diagnostics,
    ) -> Result<VariantTable, GrsParseError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let layout = ColumnLayout::from_headers(&headers)?;

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for result in reader.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            if let Some(record) = Self::coerce_row(&row, &layout, line, &mut failures) {
                records.push(record);
            }
        }

        if !failures.is_empty() {
            return Err(GrsParseError::TypeMismatch { failures });
        }

        let total = records.len();
        let has_maf = layout.maf.is_some();

        if self.verbose {
            diagnostics.info(&format!(
                "Applying p-value threshold (p <= {}).",
                self.p_threshold
            ));
            if has_maf {
                diagnostics.info(&format!(
                    "Applying MAF threshold (MAF >= {}).",
                    self.maf_threshold
                ));
            }
        }

        records.retain(|record| self.passes(record));

        debug!(
            "Kept {} of {} variants (p <= {}, MAF >= {}, maf column: {})",
            records.len(),
            total,
            self.p_threshold,
            self.maf_threshold,
            has_maf
        );

        Ok(VariantTable { records, has_maf })
    }

    /// Row predicate: p-value within bound and, when known, MAF within bound
    pub fn passes(&self, record: &VariantRecord) -> bool {
        let p_ok = record.p_value <= self.p_threshold;
        let maf_ok = match record.maf {
            Some(maf) => maf >= self.maf_threshold,
            None => true,
        };
        p_ok && maf_ok
    }

    /// Coerce one row; failures are accumulated rather than returned early
    fn coerce_row(
        row: &StringRecord,
        layout: &ColumnLayout,
        line: u64,
        failures: &mut Vec<CoercionFailure>,
    ) -> Option<VariantRecord> {
        let cell = |idx: usize| row.get(idx).unwrap_or("");
        let before = failures.len();

        let mut fail = |column: &'static str, value: &str, expected: &'static str| {
            failures.push(CoercionFailure {
                line,
                column,
                value: value.to_string(),
                expected,
            });
        };

        let pos = cell(layout.pos).parse::<u64>();
        if pos.is_err() {
            fail("pos", cell(layout.pos), "non-negative integer");
        }

        let p_value = parse_float(cell(layout.p_value));
        if p_value.is_none() {
            fail("p-value", cell(layout.p_value), "float");
        }

        let effect = parse_float(cell(layout.effect));
        if effect.is_none() {
            fail("effect", cell(layout.effect), "float");
        }

        let maf = match layout.maf {
            Some(idx) => {
                let parsed = parse_float(cell(idx));
                if parsed.is_none() {
                    fail(MAF_COLUMN, cell(idx), "float");
                }
                parsed
            }
            None => None,
        };

        if failures.len() != before {
            return None;
        }

        Some(VariantRecord {
            name: cell(layout.name).to_string(),
            chrom: cell(layout.chrom).to_string(),
            pos: pos.ok()?,
            reference: normalize_allele(cell(layout.reference)),
            risk: normalize_allele(cell(layout.risk)),
            p_value: p_value?,
            effect: effect?,
            maf,
        })
    }
}

/// Parse a GRS file with the given parser settings
pub fn parse_grs_file(path: impl AsRef<Path>, parser: &GrsParser) -> Result<VariantTable, GrsParseError> {
    parser.parse(path)
}
