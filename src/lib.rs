// ==============================================================================
// lib.rs - GRS Tools Library
// ==============================================================================
// Description: Library interface for GRS parsing and score regression modules
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-09-24
// Version: 1.1.0
// ==============================================================================

pub mod diagnostics;
pub mod engine;
pub mod formula;
pub mod models;
pub mod output;
pub mod parsers;
pub mod regression;

pub use models::{RegressionResult, TestKind, VariantRecord, VariantTable};
pub use parsers::{parse_computed_grs_file, parse_grs_file, GrsParser};
pub use regression::{regress, RegressionError, ScoreRegression};
