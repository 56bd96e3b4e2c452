// ==============================================================================
// parsers/source.rs - Input Source Opening
// ==============================================================================
// Description: Opens delimited input files, decompressing gzip transparently
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-09-22
// Version: 1.0.1
// ==============================================================================

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Open `path` for reading
///
/// Files ending in `.gz` are decompressed on the fly (bgzip output is
/// multi-member gzip, hence `MultiGzDecoder`).
pub fn open_source(path: &Path) -> std::io::Result<Box<dyn Read>> {
    let file = File::open(path)?;

    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        debug!("Opening gzip-compressed input: {:?}", path);
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
