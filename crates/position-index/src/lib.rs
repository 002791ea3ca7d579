pub use chess_core;

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod merge;
pub mod report;
pub mod store;
pub mod titles;

pub use batch::{run, BatchOutcome, CancelToken};
pub use config::{Cli, Mode, PipelineConfig};
pub use error::{PipelineError, Result};
pub use export::{read_export, ExportRecord, ExportTable, ExportVideo};
pub use merge::{reduce_graphs, MergeEngine, MergeOutput};
pub use report::{BatchReport, FailureKind, RunStatus, Summary};
pub use store::{load_snapshot, save_snapshot, PositionStore};
pub use titles::{NoTitles, TitleCache, TitleFile, TitleSource};
