#![allow(dead_code)]

use position_index::{run, BatchOutcome, CancelToken, PipelineConfig};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUBJECT: &str = "sensei";

/// One game record in the series file shape, subject playing `subject_color`.
pub fn game(id: &str, subject_color: &str, video_url: &str, plies: &[(&str, Option<&str>)]) -> Value {
    let opponent_color = if subject_color == "white" { "black" } else { "white" };
    let plies: Vec<Value> = plies
        .iter()
        .map(|(san, clock)| json!({ "move": san, "clockRemaining": clock }))
        .collect();
    json!({
        "id": id,
        "players": [
            { "username": SUBJECT, "color": subject_color },
            { "username": format!("opp-{}", id), "color": opponent_color }
        ],
        "time_control": "180+2",
        "result": "*",
        "video_url": video_url,
        "plies": plies
    })
}

/// Same as [`game`] but with every clock reading absent.
pub fn game_without_clocks(id: &str, subject_color: &str, moves: &[&str]) -> Value {
    let plies: Vec<(&str, Option<&str>)> = moves.iter().map(|m| (*m, None)).collect();
    game(id, subject_color, "https://youtu.be/vid0", &plies)
}

pub fn write_series(dir: &Path, name: &str, games: &[Value]) {
    let text = serde_json::to_string_pretty(games).unwrap();
    fs::write(dir.join(name), text).unwrap();
}

pub struct Workspace {
    pub input: tempfile::TempDir,
    pub output: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            input: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.output.path().join("positions.json")
    }

    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.input.path(), self.export_path());
        config.subject_usernames = vec![SUBJECT.to_string()];
        config.workers = 2;
        config
    }

    pub fn run(&self) -> BatchOutcome {
        run(&self.config(), &CancelToken::new()).unwrap()
    }

    pub fn export_text(&self) -> String {
        fs::read_to_string(self.export_path()).unwrap()
    }
}
