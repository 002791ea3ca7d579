//! Canonical position keys.
//!
//! A key is the first four FEN fields: placement, side to move, castling rights
//! and en passant target. The halfmove clock and fullmove number are dropped so
//! that transpositions land on the same key. Consumers derive keys the same way,
//! so this format is part of the export contract.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 4 or 6 FEN fields, found {0}")]
    FieldCount(usize),

    #[error("invalid FEN: {0}")]
    Invalid(String),
}

/// Reduced position descriptor used as the graph key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionKey(String);

impl PositionKey {
    /// Key for a position. En passant is only written when a capture is legal.
    pub fn from_position(pos: &Chess) -> Self {
        let fen = Fen::from_position(pos, EnPassantMode::Legal);
        Self(strip_counters(&fen.to_string()))
    }

    pub fn start() -> Self {
        Self::from_position(&Chess::default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a full (6-field) or already reduced (4-field) FEN to its key.
///
/// The descriptor is re-rendered through the position model, so an en passant
/// square that allows no capture normalizes to `-`. Idempotent.
pub fn normalize_fen(fen: &str) -> Result<PositionKey, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 4 && fields.len() != 6 {
        return Err(FenError::FieldCount(fields.len()));
    }

    let padded = format!("{} 0 1", fields[..4].join(" "));
    let parsed = padded
        .parse::<Fen>()
        .map_err(|e| FenError::Invalid(e.to_string()))?;
    let pos: Chess = parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| FenError::Invalid(e.to_string()))?;

    Ok(PositionKey::from_position(&pos))
}

/// Strips move counters from FEN, keeping only position + side + castling + ep.
fn strip_counters(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}
