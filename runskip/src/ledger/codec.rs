//! Versioned blob encoding for the memo ledger.
//!
//! A blob is a gzip-compressed JSON envelope:
//!
//! ```json
//! { "schema": "runskip-ledger", "version": 1, "checksum": "<sha256>", "entries": { ... } }
//! ```
//!
//! The header is checked before the entries are interpreted, so a blob
//! written by a future version is rejected as a whole instead of being
//! half-parsed.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::{LedgerEntry, MemoLedger};
use crate::errors::SkipError;

/// Schema tag written into every blob.
pub const LEDGER_SCHEMA: &str = "runskip-ledger";

/// Current blob version.
pub const LEDGER_VERSION: u32 = 1;

/// Size accounting for one encode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodecMetrics {
    /// JSON size in bytes.
    pub json_bytes: usize,
    /// Compressed size in bytes.
    pub compressed_bytes: usize,
    /// Compression ratio (compressed/json).
    pub ratio: f64,
}

impl CodecMetrics {
    /// Creates new metrics.
    #[must_use]
    pub fn new(json_bytes: usize, compressed_bytes: usize) -> Self {
        let ratio = if json_bytes == 0 {
            1.0
        } else {
            compressed_bytes as f64 / json_bytes as f64
        };
        Self {
            json_bytes,
            compressed_bytes,
            ratio,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    schema: String,
    version: u32,
    checksum: String,
    entries: serde_json::Value,
}

fn checksum(entries: &serde_json::Value) -> Result<String, SkipError> {
    let bytes = serde_json::to_vec(entries)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Encodes a ledger into a compressed blob.
pub fn encode(ledger: &MemoLedger) -> Result<(Vec<u8>, CodecMetrics), SkipError> {
    let entries = serde_json::to_value(ledger.entries())?;
    let envelope = Envelope {
        schema: LEDGER_SCHEMA.to_string(),
        version: LEDGER_VERSION,
        checksum: checksum(&entries)?,
        entries,
    };
    let json = serde_json::to_vec(&envelope)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    let metrics = CodecMetrics::new(json.len(), compressed.len());
    Ok((compressed, metrics))
}

/// Decodes a blob produced by [`encode`].
///
/// Fails on corrupt data, a foreign schema, an unknown version or a
/// checksum mismatch.
pub fn decode(blob: &[u8]) -> Result<MemoLedger, SkipError> {
    let mut json = Vec::new();
    GzDecoder::new(blob)
        .read_to_end(&mut json)
        .map_err(|e| SkipError::ledger(format!("blob is not valid gzip: {e}")))?;

    let envelope: Envelope = serde_json::from_slice(&json)
        .map_err(|e| SkipError::ledger(format!("blob header is unreadable: {e}")))?;

    if envelope.schema != LEDGER_SCHEMA {
        return Err(SkipError::ledger(format!(
            "unrecognized ledger schema '{}'",
            envelope.schema
        )));
    }
    if envelope.version != LEDGER_VERSION {
        return Err(SkipError::ledger(format!(
            "unsupported ledger version {} (this build reads version {LEDGER_VERSION})",
            envelope.version
        )));
    }
    let actual = checksum(&envelope.entries)?;
    if actual != envelope.checksum {
        return Err(SkipError::ledger(format!(
            "checksum mismatch: expected {}, got {actual}",
            envelope.checksum
        )));
    }

    let entries: BTreeMap<u64, LedgerEntry> = serde_json::from_value(envelope.entries)
        .map_err(|e| SkipError::ledger(format!("ledger entries are malformed: {e}")))?;
    Ok(MemoLedger::from_entries(entries))
}
