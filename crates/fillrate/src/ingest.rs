//! Delimited-input reading and content hashing.
//!
//! The input is one UTF-8 delimited text file with a header row. Schema
//! inference is bounded; per-column coercion to the typed schema happens
//! later, in [`crate::transform`], so a file that merely contains odd cell
//! values still loads here. Only a file that cannot be parsed as tabular
//! data at all is rejected.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::{FillRateError, Result};

/// Number of rows used for CSV schema inference.
const INFER_SCHEMA_ROWS: usize = 100;

/// Parse raw delimited bytes into a DataFrame.
///
/// Any reader failure maps to [`FillRateError::Unreadable`]: per the error
/// taxonomy, unreadable input aborts before anything is computed.
pub fn read_delimited(bytes: &[u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| FillRateError::Unreadable(e.to_string()))?;

    if df.width() == 0 {
        return Err(FillRateError::Unreadable("no columns found".to_string()));
    }

    tracing::debug!(rows = df.height(), columns = df.width(), "parsed input");
    Ok(df)
}

/// Read a delimited file from disk.
pub fn read_delimited_file(path: &Path) -> Result<DataFrame> {
    let bytes = std::fs::read(path).map_err(|source| FillRateError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read input file");
    read_delimited(&bytes)
}

/// SHA-256 hex digest of the raw input bytes.
///
/// Used as the content-addressed cache key: re-uploading identical content
/// reuses the cached derivation deterministically.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
