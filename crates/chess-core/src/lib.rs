//! Chess side of the position index: ingestion, clock arithmetic, position
//! keys and per-game graph construction. No I/O happens here.

pub mod builder;
pub mod error;
pub mod game_data;
pub mod graph;
pub mod ingest;
pub mod pgn;
pub mod position;
pub mod timestamps;
pub mod video;

pub use builder::{build_game_graph, GameBuild, GameState};
pub use error::{ApplyError, ParseError};
pub use game_data::{GameRecord, GameResult, Player, Ply, RawGame, Role, Side, TimeControl};
pub use graph::{Edge, EdgeKey, MergeIntegrityWarning, PositionGraph, PositionNode};
pub use ingest::Ingestor;
pub use position::{normalize_fen, FenError, PositionKey};
pub use timestamps::{compute_timings, ClockAnomaly, PlyTiming};
pub use video::{VideoReference, VideoSource};
