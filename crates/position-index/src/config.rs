//! Run configuration: CLI flags, falling back to environment variables
//! (`.env` honored), falling back to compiled defaults.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Recompile the whole graph from the input games.
    Rebuild,
    /// Re-export the last snapshot with fresh video titles; no games are parsed.
    RefreshTitles,
}

/// Compile annotated games into a position → video lookup table
#[derive(Parser, Debug)]
#[clap(name = "compile-positions")]
pub struct Cli {
    /// Directory of per-series game record files (*.json)
    #[clap(env = "POSITION_INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Path of the exported lookup table
    #[clap(env = "POSITION_OUTPUT")]
    pub output: PathBuf,

    #[clap(long, value_enum, env = "POSITION_MODE", default_value = "rebuild")]
    pub mode: Mode,

    /// Seconds between video time zero and the first move
    #[clap(long, env = "VIDEO_ANCHOR_OFFSET", default_value = "0", allow_hyphen_values = true)]
    pub anchor_offset: f64,

    /// JSON file mapping video id to title
    #[clap(long, env = "VIDEO_TITLES_FILE")]
    pub titles: Option<PathBuf>,

    /// Subject account, used for players without an explicit role (repeatable)
    #[clap(long = "subject", env = "SUBJECT_USERNAMES", value_delimiter = ',')]
    pub subjects: Vec<String>,

    /// Worker threads for per-game processing (default: one per CPU)
    #[clap(long, env = "POSITION_WORKERS")]
    pub workers: Option<usize>,

    /// Intermediate graph snapshot (default: <OUTPUT>.bin)
    #[clap(long, env = "POSITION_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Batch report (default: <OUTPUT>.report.json)
    #[clap(long, env = "POSITION_REPORT")]
    pub report: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    pub anchor_offset: f64,
    pub titles: Option<PathBuf>,
    pub subject_usernames: Vec<String>,
    pub workers: usize,
    pub snapshot: PathBuf,
    pub report: PathBuf,
}

impl PipelineConfig {
    /// Config with defaults for everything but the two paths.
    pub fn new(input_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            input_dir: input_dir.into(),
            snapshot: sibling(&output, "bin"),
            report: sibling(&output, "report.json"),
            output,
            mode: Mode::Rebuild,
            anchor_offset: 0.0,
            titles: None,
            subject_usernames: Vec::new(),
            workers: num_cpus::get(),
        }
    }
}

impl From<Cli> for PipelineConfig {
    fn from(cli: Cli) -> Self {
        let mut config = PipelineConfig::new(cli.input_dir, cli.output);
        config.mode = cli.mode;
        config.anchor_offset = cli.anchor_offset;
        config.titles = cli.titles;
        config.subject_usernames = cli
            .subjects
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(workers) = cli.workers.filter(|w| *w > 0) {
            config.workers = workers;
        }
        if let Some(snapshot) = cli.snapshot {
            config.snapshot = snapshot;
        }
        if let Some(report) = cli.report {
            config.report = report;
        }
        config
    }
}

/// `out/positions.json` -> `out/positions.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
