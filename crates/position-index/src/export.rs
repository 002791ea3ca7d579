//! Exporter: the lookup table the presentation layer loads.
//!
//! One record per canonical key. Lists are sorted, and the table is a sorted
//! map, so a fixed graph always serializes to the same bytes.

use chess_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::store::{write_atomically, PositionStore};
use crate::titles::TitleCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportVideo {
    pub video_id: String,
    pub offset_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub video_refs: Vec<ExportVideo>,
    pub next_by_subject: Vec<String>,
    pub next_faced: Vec<String>,
}

/// Canonical position key -> record.
pub type ExportTable = BTreeMap<String, ExportRecord>;

pub fn export_store<S: PositionStore + ?Sized>(store: &S, titles: &mut TitleCache<'_>) -> ExportTable {
    let mut table = ExportTable::new();

    for (key, node) in store.iter() {
        let video_refs = node
            .videos
            .keys()
            .map(|(video_id, offset)| ExportVideo {
                video_id: video_id.clone(),
                offset_seconds: *offset,
                title: titles.get(video_id),
            })
            .collect();

        // Edge keys are unique per (move, role), so these lists are already deduplicated.
        let moves = |role: Role| -> Vec<String> {
            node.moves_by(role).into_iter().map(str::to_string).collect()
        };

        table.insert(
            key.into_string(),
            ExportRecord {
                video_refs,
                next_by_subject: moves(Role::Subject),
                next_faced: moves(Role::Opponent),
            },
        );
    }

    table
}

/// Write the table as pretty JSON, replacing any previous export atomically.
pub fn write_export<P: AsRef<Path>>(table: &ExportTable, path: P) -> Result<()> {
    let path = path.as_ref();
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, table).map_err(|e| PipelineError::json(path, e))?;
        writer.write_all(b"\n").map_err(|e| PipelineError::io(path, e))?;
        writer.flush().map_err(|e| PipelineError::io(path, e))
    })
}

pub fn read_export<P: AsRef<Path>>(path: P) -> Result<ExportTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| PipelineError::json(path, e))
}
