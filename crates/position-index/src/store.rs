//! Keyed position store contract and its backings.
//!
//! The merge engine only talks to [`PositionStore`], so any backing that can
//! get, put and iterate nodes in key order can hold the graph. The in-memory
//! [`PositionGraph`] is the default; snapshots persist it with bincode between
//! a rebuild and a later title refresh.

use chess_core::{MergeIntegrityWarning, PositionGraph, PositionKey, PositionNode};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};

pub trait PositionStore {
    fn get(&self, key: &PositionKey) -> Option<PositionNode>;

    fn put(&mut self, key: PositionKey, node: PositionNode);

    /// All nodes in ascending key order.
    fn iter(&self) -> Box<dyn Iterator<Item = (PositionKey, PositionNode)> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union `node` into whatever is stored under `key` (see
    /// [`PositionNode::merge`]). Order of calls never changes the final contents.
    fn merge_node(&mut self, key: PositionKey, node: PositionNode) -> Vec<MergeIntegrityWarning> {
        match self.get(&key) {
            Some(mut existing) => {
                let warnings = existing.merge(&key, node);
                self.put(key, existing);
                warnings
            }
            None => {
                self.put(key, node);
                Vec::new()
            }
        }
    }
}

impl PositionStore for PositionGraph {
    fn get(&self, key: &PositionKey) -> Option<PositionNode> {
        self.nodes.get(key).cloned()
    }

    fn put(&mut self, key: PositionKey, node: PositionNode) {
        self.nodes.insert(key, node);
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (PositionKey, PositionNode)> + '_> {
        Box::new(self.nodes.iter().map(|(k, n)| (k.clone(), n.clone())))
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    // In place, without the get/put clone.
    fn merge_node(&mut self, key: PositionKey, node: PositionNode) -> Vec<MergeIntegrityWarning> {
        match self.nodes.get_mut(&key) {
            Some(existing) => existing.merge(&key, node),
            None => {
                self.nodes.insert(key, node);
                Vec::new()
            }
        }
    }
}

/// Copy any store into an in-memory graph.
pub fn to_graph<S: PositionStore + ?Sized>(store: &S) -> PositionGraph {
    let mut graph = PositionGraph::new();
    for (key, node) in store.iter() {
        graph.nodes.insert(key, node);
    }
    graph
}

/// Load a graph snapshot from a bincode file.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<PositionGraph> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader = BufReader::new(file);
    let graph: PositionGraph = bincode::deserialize_from(reader)?;
    Ok(graph)
}

/// Save a graph snapshot. Written to a temp file and renamed into place, so a
/// crash never leaves a half-written snapshot behind.
pub fn save_snapshot<S: PositionStore + ?Sized, P: AsRef<Path>>(store: &S, path: P) -> Result<()> {
    let path = path.as_ref();
    let graph = to_graph(store);
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &graph)?;
        writer.flush().map_err(|e| PipelineError::io(path, e))
    })
}

pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    let file = File::create(&tmp).map_err(|e| PipelineError::io(&tmp, e))?;
    write(file)?;
    fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}
