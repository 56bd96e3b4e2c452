// ==============================================================================
// engine/mod.rs - Regression Test Engines
// ==============================================================================
// Description: Engine interface for named regression tests and built-in engine
// Author: Matt Barham
// Created: 2026-09-18
// Modified: 2026-10-18
// Version: 1.3.0
// ==============================================================================
// An engine fits one model per group of samples and reports, for every term,
// the coefficient, standard error, confidence interval and p-value. Results
// come back as a plain Vec, one entry per fitted group.
// ==============================================================================

pub mod cholesky;
pub mod linear;
pub mod logistic;

use ndarray::{Array1, Array2};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::formula::ModelFormula;
use crate::models::{MergedAnalysisTable, TableError, TestKind};

/// Name under which engines report the intercept term
pub const INTERCEPT_TERM: &str = "intercept";

/// Errors raised while fitting a model
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Data error: {0}")]
    Data(#[from] TableError),

    #[error("Only {found} complete samples, at least {required} are needed")]
    InsufficientSamples { found: usize, required: usize },

    #[error("Logistic regression requires a 0/1 outcome, found {0}")]
    NonBinaryOutcome(f64),

    #[error("Outcome is constant ({0}), R² is undefined")]
    ConstantOutcome(f64),

    #[error("Design matrix is singular (collinear or constant terms)")]
    SingularMatrix,

    #[error("Model did not converge after {0} iterations")]
    NoConvergence(usize),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Distribution error: {0}")]
    Distribution(String),
}

/// Per-term statistics of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermResult {
    pub name: String,
    pub coef: f64,
    pub std_err: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
    /// t (linear) or Wald z (logistic)
    pub statistic: f64,
    pub p_value: f64,
}

/// Model-level statistics of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStats {
    /// Complete samples used in the fit
    pub n_samples: usize,
    pub r_squared: Option<f64>,
    pub r_squared_adj: Option<f64>,
}

/// Results of one fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultGroup {
    pub terms: Vec<TermResult>,
    pub model: ModelStats,
}

impl ResultGroup {
    pub fn term(&self, name: &str) -> Option<&TermResult> {
        self.terms.iter().find(|t| t.name == name)
    }
}

/// Executes a named regression test over a merged analysis table
pub trait RegressionEngine {
    fn execute(
        &self,
        data: &MergedAnalysisTable,
        formula: &ModelFormula,
        test: TestKind,
    ) -> Result<Vec<ResultGroup>, EngineError>;
}

/// Settings for the built-in engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Coverage of the reported confidence intervals
    pub confidence_level: f64,

    /// Newton-Raphson iteration cap (logistic)
    pub max_iterations: usize,

    /// Convergence threshold on the largest coefficient update (logistic)
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.max_iterations == 0 {
            return Err(EngineError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper quantile for two-sided intervals
    pub(crate) fn upper_quantile(&self) -> f64 {
        1.0 - (1.0 - self.confidence_level) / 2.0
    }
}

/// Outcome vector and design matrix (intercept column first)
#[derive(Debug, Clone)]
pub struct Design {
    pub y: Array1<f64>,
    pub x: Array2<f64>,
    /// Column names of `x`, starting with the intercept
    pub names: Vec<String>,
}

impl Design {
    /// Build the design from the model columns, keeping complete samples only
    pub fn from_table(
        data: &MergedAnalysisTable,
        formula: &ModelFormula,
    ) -> Result<Self, EngineError> {
        let mut terms = formula
            .columns()
            .map(|column| data.numeric_column(column))
            .collect::<Result<Vec<_>, _>>()?;
        let outcome = terms.remove(0);

        let mut y = Vec::new();
        let mut x = Vec::new();

        for (row, value) in outcome.iter().enumerate() {
            let complete = value
                .into_iter()
                .chain(terms.iter().filter_map(|column| column[row].as_ref()))
                .filter(|v| v.is_finite())
                .count()
                == terms.len() + 1;

            if !complete {
                continue;
            }

            y.push(value.unwrap_or_default());
            x.push(1.0);
            x.extend(terms.iter().map(|column| column[row].unwrap_or_default()));
        }

        let n = y.len();
        let p = terms.len() + 1;
        debug!(
            "Design: {} complete samples of {} ({} dropped), {} parameters",
            n,
            data.len(),
            data.len() - n,
            p
        );

        if n <= p {
            return Err(EngineError::InsufficientSamples {
                found: n,
                required: p + 1,
            });
        }

        let x = Array2::from_shape_vec((n, p), x)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let mut names = vec![INTERCEPT_TERM.to_string()];
        names.extend(formula.terms.iter().cloned());

        Ok(Self {
            y: Array1::from(y),
            x,
            names,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.x.ncols()
    }
}

/// Built-in engine: OLS for linear tests, maximum likelihood for logistic
///
/// Always fits the whole table as a single group.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsEngine {
    pub config: EngineConfig,
}

impl StatsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl RegressionEngine for StatsEngine {
    fn execute(
        &self,
        data: &MergedAnalysisTable,
        formula: &ModelFormula,
        test: TestKind,
    ) -> Result<Vec<ResultGroup>, EngineError> {
        self.config.validate()?;

        let design = Design::from_table(data, formula)?;
        let group = match test {
            TestKind::Linear => linear::fit(&design, &self.config)?,
            TestKind::Logistic => logistic::fit(&design, &self.config)?,
        };

        Ok(vec![group])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleTable;

    fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> SampleTable {
        SampleTable {
            index_name: "sample".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            samples: (0..rows.len()).map(|i| format!("s{}", i + 1)).collect(),
            rows: rows
                .iter()
                .map(|cells| cells.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_design_drops_incomplete_samples() {
        let data = table(
            &["y", "grs", "age"],
            &[
                &[Some("1"), Some("0.1"), Some("30")],
                &[None, Some("0.2"), Some("31")],
                &[Some("2"), Some("0.3"), None],
                &[Some("3"), Some("0.4"), Some("33")],
                &[Some("4"), Some("nan"), Some("34")],
                &[Some("5"), Some("0.6"), Some("35")],
                &[Some("6"), Some("0.7"), Some("36")],
            ],
        );
        let formula = ModelFormula::parse("y ~ grs + age").unwrap();

        let design = Design::from_table(&data, &formula).unwrap();

        assert_eq!(design.n_samples(), 4);
        assert_eq!(design.n_params(), 3);
        assert_eq!(design.names, vec!["intercept", "grs", "age"]);
        assert_eq!(design.y.to_vec(), vec![1.0, 3.0, 5.0, 6.0]);
        assert_eq!(design.x.row(1).to_vec(), vec![1.0, 0.4, 33.0]);
    }

    #[test]
    fn test_design_insufficient_samples() {
        let data = table(
            &["y", "grs"],
            &[&[Some("1"), Some("0.1")], &[Some("2"), Some("0.2")]],
        );
        let formula = ModelFormula::parse("y ~ grs").unwrap();

        assert!(matches!(
            Design::from_table(&data, &formula).unwrap_err(),
            EngineError::InsufficientSamples { found: 2, required: 3 }
        ));
    }

    #[test]
    fn test_design_unknown_column() {
        let data = table(&["y", "grs"], &[&[Some("1"), Some("0.1")]]);
        let formula = ModelFormula::parse("y ~ grs + bmi").unwrap();

        assert!(matches!(
            Design::from_table(&data, &formula).unwrap_err(),
            EngineError::Data(TableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_invalid_confidence_level() {
        let engine = StatsEngine::with_config(EngineConfig {
            confidence_level: 1.5,
            ..EngineConfig::default()
        });
        let data = table(&["y", "grs"], &[&[Some("1"), Some("0.1")]]);
        let formula = ModelFormula::parse("y ~ grs").unwrap();

        assert!(matches!(
            engine.execute(&data, &formula, TestKind::Linear).unwrap_err(),
            EngineError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_stats_engine_returns_single_group() {
        let data = table(
            &["y", "grs"],
            &[
                &[Some("2.1"), Some("1")],
                &[Some("3.9"), Some("2")],
                &[Some("6.2"), Some("3")],
                &[Some("7.8"), Some("4")],
                &[Some("10.1"), Some("5")],
            ],
        );
        let formula = ModelFormula::parse("y ~ grs").unwrap();

        let groups = StatsEngine::new()
            .execute(&data, &formula, TestKind::Linear)
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert!(groups[0].term("grs").is_some());
        assert!(groups[0].term(INTERCEPT_TERM).is_some());
        assert_eq!(groups[0].model.n_samples, 5);
    }
}
