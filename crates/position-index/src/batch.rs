//! Batch runner.
//!
//! Rebuild: discover series files, build every game's graph on a worker pool,
//! reduce each file's graphs as a tree, fold the file graphs into the store one
//! at a time, then snapshot, export and report. Refresh: reload the snapshot
//! and re-export with titles.

use chess_core::{build_game_graph, GameBuild, GameState, Ingestor, ParseError, PositionGraph};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Mode, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::export::{export_store, write_export};
use crate::merge::{reduce_graphs, MergeEngine};
use crate::report::{AnomalyEntry, BatchReport, FailureKind, GameFailure, RunStatus};
use crate::store::{load_snapshot, save_snapshot, PositionStore};
use crate::titles::{NoTitles, TitleCache, TitleFile, TitleSource};

/// Stops the run between games. Games already built are still folded.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub report: BatchReport,
    pub status: RunStatus,
}

struct InputRecord {
    file: String,
    value: JsonValue,
}

enum GameOutcome {
    Built(GameBuild),
    Rejected(ParseError),
    Skipped,
}

pub fn run(config: &PipelineConfig, cancel: &CancelToken) -> Result<BatchOutcome> {
    match config.mode {
        Mode::Rebuild => rebuild(config, cancel),
        Mode::RefreshTitles => refresh_titles(config),
    }
}

pub fn rebuild(config: &PipelineConfig, cancel: &CancelToken) -> Result<BatchOutcome> {
    let mut report = BatchReport::default();

    let files = discover_inputs(&config.input_dir)?;
    info!(dir = %config.input_dir.display(), files = files.len(), "Found game series files");

    let mut records = Vec::new();
    for path in &files {
        let file = file_label(path);
        match read_series(path) {
            Ok(values) => {
                info!(file = %file, games = values.len(), "Read series");
                report.summary.files_read += 1;
                records.extend(values.into_iter().map(|value| InputRecord {
                    file: file.clone(),
                    value,
                }));
            }
            Err(failure) => {
                warn!(file = %file, error = %failure.message, "Skipping unreadable series file");
                report.record_failure(failure);
            }
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()?;

    let ingestor = Ingestor::new(&config.subject_usernames);
    let anchor = config.anchor_offset;
    let outcomes: Vec<(String, GameOutcome)> = pool.install(|| {
        use rayon::prelude::*;
        records
            .into_par_iter()
            .map(|record| {
                let outcome = process_game(&ingestor, anchor, record.value, cancel);
                (record.file, outcome)
            })
            .collect()
    });

    let mut engine = MergeEngine::default();
    let mut graphs_by_file: BTreeMap<String, Vec<PositionGraph>> = BTreeMap::new();

    for (file, outcome) in outcomes {
        match outcome {
            GameOutcome::Skipped => report.summary.games_skipped += 1,
            GameOutcome::Rejected(e) => {
                report.record_failure(GameFailure {
                    game_id: Some(e.game_id.clone()),
                    file,
                    kind: FailureKind::Parse,
                    ply: None,
                    message: e.to_string(),
                });
            }
            GameOutcome::Built(build) => {
                record_build(&mut report, &file, &build);
                engine.extend_warnings(build.warnings);
                graphs_by_file.entry(file).or_default().push(build.graph);
            }
        }
    }

    for (file, graphs) in graphs_by_file {
        let games = graphs.len();
        let (graph, warnings) = pool.install(|| reduce_graphs(graphs));
        info!(file = %file, games, positions = graph.len(), "Merged series");
        engine.extend_warnings(warnings);
        engine.fold(graph);
    }

    let store = settle(engine, &mut report);

    let status = report.status();
    if status == RunStatus::Fatal {
        warn!("Nothing was produced; keeping any previous export");
    } else {
        save_snapshot(&store, &config.snapshot)?;
        info!(path = %config.snapshot.display(), "Wrote graph snapshot");

        let source = rebuild_title_source(config);
        let mut titles = TitleCache::new(source.as_ref());
        let table = export_store(&store, &mut titles);
        write_export(&table, &config.output)?;
        info!(
            path = %config.output.display(),
            positions = table.len(),
            videos = titles.len(),
            untitled = titles.misses(),
            "Wrote export"
        );
    }

    report.write(&config.report)?;
    Ok(BatchOutcome { report, status })
}

/// Re-export the last snapshot with current titles. No game is parsed.
pub fn refresh_titles(config: &PipelineConfig) -> Result<BatchOutcome> {
    let titles_path = config
        .titles
        .as_ref()
        .ok_or_else(|| PipelineError::Config("refresh-titles needs a titles file".to_string()))?;
    let source = TitleFile::load(titles_path)?;
    let graph = load_snapshot(&config.snapshot)?;
    info!(path = %config.snapshot.display(), positions = graph.len(), "Loaded graph snapshot");

    let mut titles = TitleCache::new(&source);
    let table = export_store(&graph, &mut titles);
    write_export(&table, &config.output)?;
    info!(
        path = %config.output.display(),
        videos = titles.len(),
        untitled = titles.misses(),
        "Re-exported with titles"
    );

    let mut report = BatchReport::default();
    report.summary.positions = PositionStore::len(&graph);
    let status = report.status();
    report.write(&config.report)?;
    Ok(BatchOutcome { report, status })
}

/// Hand the merged graph over and record what merging found.
fn settle(engine: MergeEngine, report: &mut BatchReport) -> PositionGraph {
    let merged = engine.finish();
    report.summary.positions = merged.store.len();
    report.integrity_warnings = merged.warnings;
    merged.store
}

fn process_game(
    ingestor: &Ingestor,
    anchor: f64,
    value: JsonValue,
    cancel: &CancelToken,
) -> GameOutcome {
    if cancel.is_cancelled() {
        return GameOutcome::Skipped;
    }
    match ingestor.ingest_value(value) {
        Ok(game) => GameOutcome::Built(build_game_graph(&game, anchor)),
        Err(e) => GameOutcome::Rejected(e),
    }
}

fn record_build(report: &mut BatchReport, file: &str, build: &GameBuild) {
    match (&build.state, &build.error) {
        (GameState::Completed, _) => report.summary.games_succeeded += 1,
        (_, Some(e)) => report.record_failure(GameFailure {
            game_id: Some(build.game_id.clone()),
            file: file.to_string(),
            kind: FailureKind::Apply,
            ply: Some(e.ply),
            message: e.to_string(),
        }),
        (state, None) => report.record_failure(GameFailure {
            game_id: Some(build.game_id.clone()),
            file: file.to_string(),
            kind: FailureKind::Apply,
            ply: None,
            message: format!("game ended in state {state:?}"),
        }),
    }

    let anomalies: Vec<AnomalyEntry> = build
        .timings
        .iter()
        .enumerate()
        .filter_map(|(ply, t)| {
            t.anomaly.map(|anomaly| AnomalyEntry {
                game_id: build.game_id.clone(),
                ply,
                anomaly,
            })
        })
        .collect();
    if !anomalies.is_empty() {
        report.summary.games_with_anomalies += 1;
        report.summary.anomalous_plies += anomalies.len();
        report.anomalies.extend(anomalies);
    }
}

/// Titles are optional on a rebuild: a broken titles file only costs the titles.
fn rebuild_title_source(config: &PipelineConfig) -> Box<dyn TitleSource> {
    match &config.titles {
        Some(path) => match TitleFile::load(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                warn!(error = %e, "Exporting without titles");
                Box::new(NoTitles)
            }
        },
        None => Box::new(NoTitles),
    }
}

/// `*.json` files directly inside `dir`, sorted.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|p| p.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// A series file is a JSON array of game records.
fn read_series(path: &Path) -> std::result::Result<Vec<JsonValue>, GameFailure> {
    let failure = |kind, message: String| GameFailure {
        game_id: None,
        file: file_label(path),
        kind,
        ply: None,
        message,
    };

    let text = fs::read_to_string(path).map_err(|e| failure(FailureKind::Io, e.to_string()))?;
    match serde_json::from_str::<JsonValue>(&text) {
        Ok(JsonValue::Array(values)) => Ok(values),
        Ok(_) => Err(failure(
            FailureKind::Parse,
            "series file is not a JSON array".to_string(),
        )),
        Err(e) => Err(failure(FailureKind::Parse, e.to_string())),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
