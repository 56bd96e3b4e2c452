// ==============================================================================
// regression.rs - GRS Regression Orchestration
// ==============================================================================
// Description: Merges computed scores with phenotypes and regresses on the GRS
// Author: Matt Barham
// Created: 2026-09-21
// Modified: 2026-10-18
// Version: 1.3.0
// ==============================================================================
// Pipeline:
//   1. Validate model (must use `grs`) and test kind (linear or logistic)
//   2. Load computed scores (indexed by `sample`) and phenotypes
//   3. Inner-join phenotypes with scores on sample ID
//   4. Run the test through the engine; exactly one result group is allowed
//   5. Extract beta / CI / p-value on `grs` (+ intercept and adj R² if linear)
// ==============================================================================

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{EngineError, RegressionEngine, ResultGroup, StatsEngine, INTERCEPT_TERM};
use crate::formula::{FormulaError, ModelFormula};
use crate::models::{RegressionResult, TableError, TestKind, UnknownTestKind};
use crate::parsers::table::{parse_computed_grs_file, SampleTableReader};
use crate::parsers::MISSING_VALUE_TOKENS;

/// Term the model must contain
pub const GRS_TERM: &str = "grs";

/// Errors that can occur while regressing a GRS on a phenotype
#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("Model configuration error: {0}")]
    ModelConfiguration(String),

    #[error("Unsupported statistical test '{0}': should be logistic or linear")]
    UnsupportedTest(String),

    #[error("Only simple, single-group regression models are supported (engine returned {groups} groups)")]
    UnsupportedConfiguration { groups: usize },

    #[error("Failed to load {what}: {source}")]
    Table {
        what: &'static str,
        #[source]
        source: TableError,
    },

    #[error("Failed to merge phenotypes with scores: {0}")]
    Merge(#[source] TableError),

    #[error("Regression failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Regression results have no '{0}'")]
    MissingTerm(String),
}

impl From<UnknownTestKind> for RegressionError {
    fn from(err: UnknownTestKind) -> Self {
        RegressionError::UnsupportedTest(err.0)
    }
}

impl From<FormulaError> for RegressionError {
    fn from(err: FormulaError) -> Self {
        RegressionError::ModelConfiguration(err.to_string())
    }
}

/// Checks run before any file is touched
///
/// # Returns
/// * `Ok((formula, test))` - Parsed model and test kind
/// * `Err(RegressionError::ModelConfiguration)` - Model omits `grs` or is malformed
/// * `Err(RegressionError::UnsupportedTest)` - Test is not linear/logistic
pub fn validate_request(model: &str, test: &str) -> Result<(ModelFormula, TestKind), RegressionError> {
    if !model.contains(GRS_TERM) {
        return Err(RegressionError::ModelConfiguration(
            "GRS not included in the regression model. For example, 'phenotype ~ grs + age' \
             would be a valid model, given that 'phenotype' and 'age' are defined in the \
             phenotypes file."
                .to_string(),
        ));
    }

    let test: TestKind = test.parse()?;
    let formula = ModelFormula::parse(model)?;

    if !formula.has_term(GRS_TERM) {
        return Err(RegressionError::ModelConfiguration(format!(
            "'{}' must be a term of the model, found '{}'",
            GRS_TERM, formula
        )));
    }

    Ok((formula, test))
}

/// Pull the normalized record out of the single result group
pub fn extract_result(group: &ResultGroup, test: TestKind) -> Result<RegressionResult, RegressionError> {
    let grs = group
        .term(GRS_TERM)
        .ok_or_else(|| RegressionError::MissingTerm(GRS_TERM.to_string()))?;

    let (intercept, r2) = match test {
        TestKind::Linear => {
            let intercept = group
                .term(INTERCEPT_TERM)
                .ok_or_else(|| RegressionError::MissingTerm(INTERCEPT_TERM.to_string()))?;
            let r2 = group
                .model
                .r_squared_adj
                .ok_or_else(|| RegressionError::MissingTerm("adjusted R²".to_string()))?;
            (Some(intercept.coef), Some(r2))
        }
        TestKind::Logistic => (None, None),
    };

    Ok(RegressionResult {
        beta: grs.coef,
        ci: (grs.lower_ci, grs.upper_ci),
        p_value: grs.p_value,
        intercept,
        r2,
    })
}

/// Regresses a computed GRS on phenotypes through a regression engine
pub struct ScoreRegression<'e> {
    engine: &'e dyn RegressionEngine,
    /// Sample identifier column of the phenotype file
    pub sample_column: String,
    /// Field delimiter of the phenotype file
    pub phenotype_delimiter: u8,
    /// Phenotype cells read as missing values
    pub missing_values: Vec<String>,
}

impl<'e> ScoreRegression<'e> {
    pub fn new(engine: &'e dyn RegressionEngine) -> Self {
        Self {
            engine,
            sample_column: "sample".to_string(),
            phenotype_delimiter: b',',
            missing_values: MISSING_VALUE_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn sample_column(mut self, column: impl Into<String>) -> Self {
        self.sample_column = column.into();
        self
    }

    pub fn phenotype_delimiter(mut self, delimiter: u8) -> Self {
        self.phenotype_delimiter = delimiter;
        self
    }

    pub fn missing_values(mut self, tokens: Vec<String>) -> Self {
        self.missing_values = tokens;
        self
    }

    /// Run the regression described by `model` and `test`
    ///
    /// The call is atomic: either a complete record or an error.
    pub fn regress(
        &self,
        model: &str,
        test: &str,
        grs_path: impl AsRef<Path>,
        phenotype_path: impl AsRef<Path>,
    ) -> Result<RegressionResult, RegressionError> {
        let (formula, test) = validate_request(model, test)?;

        let scores = parse_computed_grs_file(grs_path.as_ref()).map_err(|source| {
            RegressionError::Table {
                what: "computed GRS file",
                source,
            }
        })?;

        let phenotypes = SampleTableReader::new(self.sample_column.clone())
            .delimiter(self.phenotype_delimiter)
            .missing_values(self.missing_values.clone())
            .read_path(phenotype_path.as_ref())
            .map_err(|source| RegressionError::Table {
                what: "phenotypes file",
                source,
            })?;

        let merged = phenotypes.merge(&scores).map_err(RegressionError::Merge)?;
        info!(
            "Merged {} phenotyped samples with {} scored samples: {} in common",
            phenotypes.len(),
            scores.len(),
            merged.len()
        );

        let groups = self.engine.execute(&merged, &formula, test)?;
        if groups.len() != 1 {
            return Err(RegressionError::UnsupportedConfiguration {
                groups: groups.len(),
            });
        }

        let result = extract_result(&groups[0], test)?;
        debug!("{} regression of '{}': {:?}", test, formula, result);

        Ok(result)
    }
}

/// Regress with the built-in engine, a `sample` phenotype index and commas
pub fn regress(
    model: &str,
    test: &str,
    grs_path: impl AsRef<Path>,
    phenotype_path: impl AsRef<Path>,
) -> Result<RegressionResult, RegressionError> {
    let engine = StatsEngine::new();
    ScoreRegression::new(&engine).regress(model, test, grs_path, phenotype_path)
}
