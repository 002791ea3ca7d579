//! Per-game graph builder.
//!
//! Walks one game's mainline from the standard start, recording every edge the
//! game took and a video reference for every position it reached.

use serde::{Deserialize, Serialize};
use shakmaty::san::{San, SanPlus, Suffix};
use shakmaty::{Chess, Position};

use crate::error::ApplyError;
use crate::game_data::GameRecord;
use crate::graph::{Edge, MergeIntegrityWarning, PositionGraph};
use crate::position::PositionKey;
use crate::timestamps::{compute_timings, video_offset, PlyTiming};
use crate::video::VideoReference;

/// Lifecycle of one game inside the ingest → build stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GameState {
    NotStarted,
    InProgress { ply: usize },
    Completed,
    /// Terminal. Plies before `ply` are still in the partial graph.
    Failed { ply: usize },
}

/// Everything one game contributes, plus how far it got.
#[derive(Debug, Clone)]
pub struct GameBuild {
    pub game_id: String,
    pub graph: PositionGraph,
    pub state: GameState,
    pub error: Option<ApplyError>,
    pub timings: Vec<PlyTiming>,
    /// Only possible with corrupt input; a single game cannot disagree with itself.
    pub warnings: Vec<MergeIntegrityWarning>,
}

impl GameBuild {
    pub fn anomalous_plies(&self) -> usize {
        self.timings.iter().filter(|t| t.is_low_confidence()).count()
    }

    pub fn is_completed(&self) -> bool {
        self.state == GameState::Completed
    }
}

/// Build the partial graph for one game.
///
/// `anchor_offset` shifts every video offset by a fixed number of seconds to
/// account for any delay between video time zero and the first move.
pub fn build_game_graph(game: &GameRecord, anchor_offset: f64) -> GameBuild {
    let timings = compute_timings(game);
    let mut graph = PositionGraph::new();
    let mut warnings = Vec::new();
    let mut state = GameState::NotStarted;
    let mut error = None;

    let reference = |elapsed: f64| VideoReference {
        video_id: game.video.video_id.clone(),
        offset_seconds: video_offset(game.video.start_seconds, anchor_offset, elapsed),
        game_id: game.id.clone(),
    };

    let mut pos = Chess::default();
    let mut current = PositionKey::start();
    graph.add_video(&current, reference(0.0));

    for (index, (ply, timing)) in game.plies.iter().zip(&timings).enumerate() {
        state = GameState::InProgress { ply: index };
        let san_text = ply.san_text();

        let mv = match ply.san.san.to_move(&pos) {
            Ok(mv) => mv,
            Err(e) => {
                error = Some(ApplyError {
                    game_id: game.id.clone(),
                    ply: index,
                    san: san_text,
                    reason: e.to_string(),
                });
                state = GameState::Failed { ply: index };
                break;
            }
        };

        // Edges are keyed by the move as the board writes it, not as the input spelled it.
        let san = San::from_move(&pos, mv.clone());

        pos = match pos.clone().play(mv) {
            Ok(next) => next,
            Err(e) => {
                error = Some(ApplyError {
                    game_id: game.id.clone(),
                    ply: index,
                    san: san_text,
                    reason: e.to_string(),
                });
                state = GameState::Failed { ply: index };
                break;
            }
        };

        let san = SanPlus {
            san,
            suffix: Suffix::from_position(&pos),
        };
        let next = PositionKey::from_position(&pos);
        if let Some(w) = graph.add_edge(Edge {
            from: current,
            san: san.to_string(),
            role: game.mover_role(index),
            to: next.clone(),
        }) {
            warnings.push(w);
        }
        graph.add_video(&next, reference(timing.elapsed));
        current = next;
    }

    if error.is_none() {
        state = GameState::Completed;
    } else {
        tracing::debug!(game_id = %game.id, ?state, "game stopped early");
    }

    GameBuild {
        game_id: game.id.clone(),
        graph,
        state,
        error,
        timings,
        warnings,
    }
}
