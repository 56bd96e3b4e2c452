// ==============================================================================
// formula.rs - Regression Model Formulas
// ==============================================================================
// Description: Parses "outcome ~ term + term" model descriptions
// Author: Matt Barham
// Created: 2026-09-18
// Modified: 2026-09-18
// Version: 1.0.0
// ==============================================================================

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a model formula
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Model must contain exactly one '~' separating outcome and terms: '{0}'")]
    MissingTilde(String),

    #[error("Model has no outcome on the left of '~'")]
    EmptyOutcome,

    #[error("Model outcome must be a single column, got '{0}'")]
    InvalidOutcome(String),

    #[error("Model has an empty term")]
    EmptyTerm,

    #[error("Term '{0}' appears more than once")]
    DuplicateTerm(String),

    #[error("Unsupported term '{0}' (only plain column names are supported)")]
    UnsupportedTerm(String),
}

/// A parsed linear model description
///
/// The intercept is always part of the fitted model and is not listed in
/// `terms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFormula {
    pub outcome: String,
    pub terms: Vec<String>,
}

fn is_plain_name(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '*' | ':' | '^' | '~' | '+'))
}

impl ModelFormula {
    /// Parse a formula such as `"y ~ grs + age"`
    pub fn parse(model: &str) -> Result<Self, FormulaError> {
        let mut sides = model.split('~');
        let (lhs, rhs) = match (sides.next(), sides.next(), sides.next()) {
            (Some(lhs), Some(rhs), None) => (lhs.trim(), rhs.trim()),
            _ => return Err(FormulaError::MissingTilde(model.to_string())),
        };

        if lhs.is_empty() {
            return Err(FormulaError::EmptyOutcome);
        }
        if !is_plain_name(lhs) {
            return Err(FormulaError::InvalidOutcome(lhs.to_string()));
        }

        let mut terms: Vec<String> = Vec::new();
        for raw in rhs.split('+') {
            let term = raw.trim();
            if term.is_empty() {
                return Err(FormulaError::EmptyTerm);
            }
            // Explicit intercept
            if term == "1" {
                continue;
            }
            if !is_plain_name(term) {
                return Err(FormulaError::UnsupportedTerm(term.to_string()));
            }
            if terms.iter().any(|t| t == term) {
                return Err(FormulaError::DuplicateTerm(term.to_string()));
            }
            terms.push(term.to_string());
        }

        if terms.is_empty() {
            return Err(FormulaError::EmptyTerm);
        }

        Ok(Self {
            outcome: lhs.to_string(),
            terms,
        })
    }

    pub fn has_term(&self, name: &str) -> bool {
        self.terms.iter().any(|t| t == name)
    }

    /// Every column the model reads: outcome first, then terms
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.outcome.as_str()).chain(self.terms.iter().map(String::as_str))
    }
}

impl FromStr for ModelFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.outcome, self.terms.join(" + "))
    }
}
