//! Colour-agnostic identity of a record.
//!
//! A position, its colour-swapped twin and any duplicates share one key, so
//! capping and splitting by key can never put an original on one side of the
//! train/validation boundary and its mirror on the other.

use sha2::{Digest, Sha256};

use crate::dataset::PositionRecord;

pub type GroupKey = String;

const SIGNATURE_CHARS: usize = 512;
const DIGEST_BYTES: usize = 20;

pub fn canonical_key(record: &PositionRecord) -> GroupKey {
    if let Some(key) = record.pair_key.as_deref().filter(|k| !k.is_empty()) {
        return key.to_string();
    }

    if !record.fen.trim().is_empty() {
        return colorless_fen_key(&record.fen);
    }

    signature_digest(record)
}

/// Upper-cases pieces and castling rights; side to move and en passant are
/// replaced by `-`.
pub fn colorless_fen_key(fen: &str) -> GroupKey {
    let mut fields = fen.split_whitespace();
    let board = fields.next().unwrap_or_default().to_ascii_uppercase();
    let castling = match fields.nth(1) {
        None | Some("-") => "-".to_string(),
        Some(rights) => rights.to_ascii_uppercase(),
    };

    format!("{board} - {castling} -")
}

// Only reachable for records built without a board.
fn signature_digest(record: &PositionRecord) -> GroupKey {
    let features = record.features.as_deref().unwrap_or_default();
    let signature = serde_json::to_string(features).unwrap_or_else(|_| "[]".to_string());
    let truncated: String = signature.chars().take(SIGNATURE_CHARS).collect();

    let digest = Sha256::digest(truncated.as_bytes());
    digest[..DIGEST_BYTES].iter().map(|b| format!("{b:02x}")).collect()
}
