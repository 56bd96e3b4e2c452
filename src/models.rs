// ==============================================================================
// models.rs - GRS Data Models
// ==============================================================================
// Description: Data structures for GRS definitions, sample tables and results
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-18
// Version: 1.2.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One variant of a GRS definition file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Variant identifier (e.g., "rs12345")
    pub name: String,

    /// Chromosome label ("1"-"22", "X", "Y", "MT", ...)
    pub chrom: String,

    /// Base pair position
    pub pos: u64,

    /// Reference allele (uppercase)
    pub reference: String,

    /// Effect/risk allele (uppercase)
    pub risk: String,

    /// Association p-value
    #[serde(rename = "p-value")]
    pub p_value: f64,

    /// Weight: log odds ratio, beta or similar
    pub effect: f64,

    /// Minor allele frequency, only when the source has a `maf` column
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub maf: Option<f64>,
}

/// Parsed and filtered GRS definition
///
/// `has_maf` is true iff every record carries a MAF value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantTable {
    pub records: Vec<VariantRecord>,
    pub has_maf: bool,
}

impl VariantTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantRecord> {
        self.records.iter()
    }
}

/// Errors raised by sample table operations (loading and merging)
#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("File has no header row")]
    EmptyFile,

    #[error("Sample column '{0}' not found in header")]
    MissingSampleColumn(String),

    #[error("Duplicate sample identifier '{sample}' at line {line}")]
    DuplicateSample { sample: String, line: u64 },

    #[error("Missing sample identifier at line {0}")]
    MissingSampleId(u64),

    #[error("Column '{0}' is present in both tables")]
    ColumnConflict(String),

    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Value '{value}' for sample '{sample}' in column '{column}' is not numeric")]
    NonNumeric {
        column: String,
        sample: String,
        value: String,
    },
}

/// Table of text cells indexed by a unique sample identifier
///
/// No type coercion happens at load time; `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    /// Name of the index column in the source file
    pub index_name: String,

    /// Data column names, in file order (index column excluded)
    pub columns: Vec<String>,

    /// Sample identifiers, in file order
    pub samples: Vec<String>,

    /// One row per sample, one cell per column
    pub rows: Vec<Vec<Option<String>>>,
}

/// Score table produced by an upstream computation step (`sample`, `grs`, ...)
pub type ComputedScoreTable = SampleTable;

/// Phenotypes and covariates per sample
pub type PhenotypeTable = SampleTable;

/// Phenotypes joined with computed scores, built per regression call
pub type MergedAnalysisTable = SampleTable;

impl SampleTable {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell value for a sample row and a column name
    #[cfg(test)]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Parse a column as floating point; missing cells stay `None`
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let col = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;

        self.rows
            .iter()
            .zip(&self.samples)
            .map(|(row, sample)| match row[col].as_deref() {
                None => Ok(None),
                Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| TableError::NonNumeric {
                    column: name.to_string(),
                    sample: sample.clone(),
                    value: raw.to_string(),
                }),
            })
            .collect()
    }

    /// Inner join with `other` on sample identifier
    ///
    /// Row order follows `self`; columns are `self`'s followed by `other`'s.
    /// Samples absent from either table are dropped.
    pub fn merge(&self, other: &SampleTable) -> Result<SampleTable, TableError> {
        if let Some(conflict) = other.columns.iter().find(|c| self.has_column(c)) {
            return Err(TableError::ColumnConflict(conflict.clone()));
        }

        let other_rows: std::collections::HashMap<&str, &Vec<Option<String>>> = other
            .samples
            .iter()
            .map(String::as_str)
            .zip(&other.rows)
            .collect();

        let mut samples = Vec::new();
        let mut rows = Vec::new();

        for (sample, row) in self.samples.iter().zip(&self.rows) {
            if let Some(other_row) = other_rows.get(sample.as_str()) {
                let mut merged = row.clone();
                merged.extend(other_row.iter().cloned());
                samples.push(sample.clone());
                rows.push(merged);
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        Ok(SampleTable {
            index_name: self.index_name.clone(),
            columns,
            samples,
            rows,
        })
    }
}

/// Statistical test family used for the GRS regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Linear,
    Logistic,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Linear => "linear",
            TestKind::Logistic => "logistic",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test kind outside of the supported set
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Statistical test should be logistic or linear (got '{0}')")]
pub struct UnknownTestKind(pub String);

impl FromStr for TestKind {
    type Err = UnknownTestKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(TestKind::Linear),
            "logistic" => Ok(TestKind::Logistic),
            other => Err(UnknownTestKind(other.to_string())),
        }
    }
}

/// Normalized result of a GRS regression
///
/// `intercept` and `r2` (adjusted R²) are only set for linear tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Coefficient on the `grs` term
    pub beta: f64,

    /// (lower, upper) confidence bounds of `beta`
    #[serde(rename = "CI")]
    pub ci: (f64, f64),

    #[serde(rename = "p-value")]
    pub p_value: f64,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intercept: Option<f64>,

    #[serde(rename = "R2", skip_serializing_if = "Option::is_none", default)]
    pub r2: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(index: &str, columns: &[&str], rows: &[(&str, &[Option<&str>])]) -> SampleTable {
        SampleTable {
            index_name: index.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            samples: rows.iter().map(|(s, _)| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(_, cells)| cells.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_test_kind_parse() {
        assert_eq!("linear".parse::<TestKind>().unwrap(), TestKind::Linear);
        assert_eq!("logistic".parse::<TestKind>().unwrap(), TestKind::Logistic);
        assert_eq!(
            "poisson".parse::<TestKind>().unwrap_err(),
            UnknownTestKind("poisson".to_string())
        );
        // Matching is exact
        assert!("Linear".parse::<TestKind>().is_err());
    }

    #[test]
    fn test_merge_is_inner_join_in_left_order() {
        let phenotypes = table(
            "ID",
            &["y", "age"],
            &[
                ("s3", &[Some("1.0"), Some("40")]),
                ("s1", &[Some("2.0"), Some("50")]),
                ("s2", &[Some("3.0"), None]),
            ],
        );
        let scores = table(
            "sample",
            &["grs"],
            &[("s1", &[Some("0.1")]), ("s3", &[Some("0.3")]), ("s9", &[Some("0.9")])],
        );

        let merged = phenotypes.merge(&scores).unwrap();

        assert_eq!(merged.samples, vec!["s3", "s1"]);
        assert_eq!(merged.columns, vec!["y", "age", "grs"]);
        assert_eq!(merged.value(0, "grs"), Some("0.3"));
        assert_eq!(merged.value(1, "age"), Some("50"));
        assert_eq!(merged.index_name, "ID");
    }

    #[test]
    fn test_merge_column_conflict() {
        let left = table("sample", &["grs"], &[("s1", &[Some("1")])]);
        let right = table("sample", &["grs"], &[("s1", &[Some("2")])]);

        match left.merge(&right).unwrap_err() {
            TableError::ColumnConflict(column) => assert_eq!(column, "grs"),
            other => panic!("Expected ColumnConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_column() {
        let t = table(
            "sample",
            &["grs", "sex"],
            &[("s1", &[Some("0.5"), Some("M")]), ("s2", &[None, Some("F")])],
        );

        assert_eq!(t.numeric_column("grs").unwrap(), vec![Some(0.5), None]);
        assert!(matches!(
            t.numeric_column("sex").unwrap_err(),
            TableError::NonNumeric { ref sample, .. } if sample == "s1"
        ));
        assert!(matches!(
            t.numeric_column("bmi").unwrap_err(),
            TableError::UnknownColumn(_)
        ));
    }

    #[test]
    fn test_regression_result_serialization() {
        let linear = RegressionResult {
            beta: 0.5,
            ci: (0.1, 0.9),
            p_value: 0.01,
            intercept: Some(1.5),
            r2: Some(0.2),
        };
        let json = serde_json::to_value(&linear).unwrap();
        assert_eq!(json["beta"], 0.5);
        assert_eq!(json["CI"], serde_json::json!([0.1, 0.9]));
        assert_eq!(json["p-value"], 0.01);
        assert_eq!(json["intercept"], 1.5);
        assert_eq!(json["R2"], 0.2);

        let logistic = RegressionResult {
            intercept: None,
            r2: None,
            ..linear
        };
        let json = serde_json::to_value(&logistic).unwrap();
        assert!(json.get("intercept").is_none());
        assert!(json.get("R2").is_none());
    }
}
