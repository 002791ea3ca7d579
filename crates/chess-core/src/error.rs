//! Per-game error types.
//!
//! Both errors are scoped to a single game: the batch records them and keeps going.

use thiserror::Error;

/// A malformed record, move token or annotation. Fails only the game it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("game {game_id}: cannot parse {token:?}: {reason}")]
pub struct ParseError {
    pub game_id: String,
    /// The offending token, or the field name when a field is missing.
    pub token: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(
        game_id: impl Into<String>,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// A syntactically valid move that is illegal in the position it was played from.
///
/// Plies before `ply` stay in the game's partial graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("game {game_id}: cannot apply {san} at ply {ply}: {reason}")]
pub struct ApplyError {
    pub game_id: String,
    /// Zero-based index of the ply that failed.
    pub ply: usize,
    pub san: String,
    pub reason: String,
}
