// ==============================================================================
// output.rs - Result Output
// ==============================================================================
// Description: Writes filtered GRS tables and JSON regression reports
// Author: Matt Barham
// Created: 2026-09-24
// Modified: 2026-10-12
// Version: 1.1.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::models::{RegressionResult, TestKind, VariantTable};
use crate::parsers::grs::{MAF_COLUMN, MANDATORY_COLUMNS};

/// Write a variant table as delimited text with the canonical header
///
/// `maf` is written last, and only when the table has it.
pub fn write_variant_table<W: Write>(table: &VariantTable, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let mut header: Vec<&str> = MANDATORY_COLUMNS.to_vec();
    if table.has_maf {
        header.push(MAF_COLUMN);
    }
    writer.write_record(&header).context("Failed to write header")?;

    for record in table.iter() {
        let mut row = vec![
            record.name.clone(),
            record.chrom.clone(),
            record.pos.to_string(),
            record.reference.clone(),
            record.risk.clone(),
            record.p_value.to_string(),
            record.effect.to_string(),
        ];
        if table.has_maf {
            row.push(record.maf.map(|m| m.to_string()).unwrap_or_default());
        }
        writer
            .write_record(&row)
            .with_context(|| format!("Failed to write variant {}", record.name))?;
    }

    writer.flush().context("Failed to flush variant table")?;
    debug!("Wrote {} variants", table.len());
    Ok(())
}

/// Checksum of one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputChecksum {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

/// Regression result with the provenance needed to reproduce it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    pub model: String,
    pub test: TestKind,
    pub generated_at: DateTime<Utc>,
    pub inputs: Vec<InputChecksum>,
    pub result: RegressionResult,
}

impl RegressionReport {
    pub fn new(
        model: &str,
        test: TestKind,
        grs_path: &Path,
        phenotype_path: &Path,
        result: RegressionResult,
    ) -> Result<Self> {
        let inputs = vec![
            InputChecksum {
                role: "grs".to_string(),
                path: grs_path.display().to_string(),
                sha256: compute_sha256(grs_path)?,
            },
            InputChecksum {
                role: "phenotypes".to_string(),
                path: phenotype_path.display().to_string(),
                sha256: compute_sha256(phenotype_path)?,
            },
        ];

        Ok(Self {
            model: model.to_string(),
            test,
            generated_at: Utc::now(),
            inputs,
            result,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize regression report")
    }
}

/// SHA-256 of a file, hex encoded
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {:?} for hashing", path))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemoryDiagnostics;
    use crate::models::VariantRecord;
    use crate::parsers::GrsParser;

    fn record(name: &str, maf: Option<f64>) -> VariantRecord {
        VariantRecord {
            name: name.to_string(),
            chrom: "1".to_string(),
            pos: 100,
            reference: "A".to_string(),
            risk: "G".to_string(),
            p_value: 0.01,
            effect: -0.5,
            maf,
        }
    }

    #[test]
    fn test_write_table_without_maf() {
        let table = VariantTable {
            records: vec![record("rs1", None)],
            has_maf: false,
        };
        let mut buffer = Vec::new();
        write_variant_table(&table, &mut buffer, b',').unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "name,chrom,pos,reference,risk,p-value,effect\nrs1,1,100,A,G,0.01,-0.5\n"
        );
    }

    #[test]
    fn test_written_table_reads_back() {
        let table = VariantTable {
            records: vec![record("rs1", Some(0.2)), record("rs2", Some(0.35))],
            has_maf: true,
        };
        let mut buffer = Vec::new();
        write_variant_table(&table, &mut buffer, b'\t').unwrap();

        let reread = GrsParser::new()
            .delimiter(b'\t')
            .parse_reader(buffer.as_slice(), &MemoryDiagnostics::new())
            .unwrap();
        assert_eq!(reread, table);
    }

    #[test]
    fn test_sha256_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(
            compute_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let grs = dir.path().join("grs.csv");
        let phenotypes = dir.path().join("phenotypes.csv");
        std::fs::write(&grs, "sample,grs\n").unwrap();
        std::fs::write(&phenotypes, "sample,y\n").unwrap();

        let result = RegressionResult {
            beta: 0.3,
            ci: (0.1, 0.5),
            p_value: 0.004,
            intercept: None,
            r2: None,
        };
        let report =
            RegressionReport::new("y ~ grs", TestKind::Logistic, &grs, &phenotypes, result).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["model"], "y ~ grs");
        assert_eq!(json["test"], "logistic");
        assert_eq!(json["inputs"][0]["role"], "grs");
        assert_eq!(json["inputs"][1]["role"], "phenotypes");
        assert_eq!(json["inputs"][0]["sha256"].as_str().unwrap().len(), 64);
        assert_eq!(json["result"]["beta"], 0.3);
        assert!(json["result"].get("R2").is_none());
    }
}
