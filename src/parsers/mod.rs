// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for GRS definitions, computed scores and phenotypes
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================

pub mod grs;
pub mod source;
pub mod table;

pub use grs::{parse_grs_file, CoercionFailure, GrsParseError, GrsParser};
pub use source::open_source;
pub use table::{parse_computed_grs_file, SampleTableReader, SCORE_SAMPLE_COLUMN};

/// Cells read as missing values in every input table
pub const MISSING_VALUE_TOKENS: [&str; 4] = ["", "NA", "NaN", "nan"];
