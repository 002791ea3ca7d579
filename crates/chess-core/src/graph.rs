//! Position graph types and the node-wise merge.
//!
//! Every mutation goes through [`PositionNode::merge`], which is a set union on
//! edges and video references. Union is associative and commutative, so graphs
//! can be folded in any order or grouping with the same result.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::game_data::Role;
use crate::position::PositionKey;
use crate::video::VideoReference;

/// Outgoing edge identity within a node: the move and who played it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub san: String,
    pub role: Role,
}

/// A full edge, for callers that want `(from, move, role) -> to` tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: PositionKey,
    pub san: String,
    pub role: Role,
    pub to: PositionKey,
}

/// Two contributions claim different destinations for the same edge.
///
/// Deterministic move application makes this impossible for well-formed data,
/// so it is reported rather than resolved silently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MergeIntegrityWarning {
    pub position: PositionKey,
    pub san: String,
    pub role: Role,
    /// Destination kept in the graph (the smaller key).
    pub kept: PositionKey,
    pub rejected: PositionKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionNode {
    pub edges: BTreeMap<EdgeKey, PositionKey>,
    /// `(video_id, offset_seconds)` -> originating game id.
    pub videos: BTreeMap<(String, u32), String>,
}

impl PositionNode {
    /// Insert one edge. Returns the conflicting destinations, if any.
    pub fn add_edge(
        &mut self,
        key: EdgeKey,
        to: PositionKey,
    ) -> Option<(PositionKey, PositionKey)> {
        match self.edges.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(to);
                None
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() == to {
                    return None;
                }
                let existing = slot.get().clone();
                let (kept, rejected) = if to < existing {
                    (to, existing)
                } else {
                    (existing, to)
                };
                slot.insert(kept.clone());
                Some((kept, rejected))
            }
        }
    }

    /// Insert one video reference, keeping the smallest game id per `(video, offset)`.
    pub fn add_video(&mut self, video_id: String, offset_seconds: u32, game_id: String) {
        self.videos
            .entry((video_id, offset_seconds))
            .and_modify(|existing| {
                if game_id < *existing {
                    *existing = game_id.clone();
                }
            })
            .or_insert(game_id);
    }

    /// Union `other` into `self`. `position` is only used to label warnings.
    pub fn merge(
        &mut self,
        position: &PositionKey,
        other: PositionNode,
    ) -> Vec<MergeIntegrityWarning> {
        let mut warnings = Vec::new();

        for (key, to) in other.edges {
            let (san, role) = (key.san.clone(), key.role);
            if let Some((kept, rejected)) = self.add_edge(key, to) {
                warnings.push(MergeIntegrityWarning {
                    position: position.clone(),
                    san,
                    role,
                    kept,
                    rejected,
                });
            }
        }

        for ((video_id, offset), game_id) in other.videos {
            self.add_video(video_id, offset, game_id);
        }

        warnings
    }

    /// Moves played from here by the given role, sorted.
    pub fn moves_by(&self, role: Role) -> Vec<&str> {
        self.edges
            .keys()
            .filter(|k| k.role == role)
            .map(|k| k.san.as_str())
            .collect()
    }

    /// Video references ordered by video id then offset.
    pub fn video_refs(&self) -> Vec<VideoReference> {
        self.videos
            .iter()
            .map(|((video_id, offset), game_id)| VideoReference {
                video_id: video_id.clone(),
                offset_seconds: *offset,
                game_id: game_id.clone(),
            })
            .collect()
    }
}

/// The positions one game (or one partial merge) touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionGraph {
    pub nodes: BTreeMap<PositionKey, PositionNode>,
}

impl PositionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&PositionNode> {
        self.nodes.get(key)
    }

    /// Ensure the node exists; reaching a position creates it even with no edges.
    pub fn node_mut(&mut self, key: &PositionKey) -> &mut PositionNode {
        self.nodes.entry(key.clone()).or_default()
    }

    pub fn add_edge(&mut self, edge: Edge) -> Option<MergeIntegrityWarning> {
        let key = EdgeKey {
            san: edge.san.clone(),
            role: edge.role,
        };
        self.node_mut(&edge.from)
            .add_edge(key, edge.to)
            .map(|(kept, rejected)| MergeIntegrityWarning {
                position: edge.from,
                san: edge.san,
                role: edge.role,
                kept,
                rejected,
            })
    }

    pub fn add_video(&mut self, at: &PositionKey, reference: VideoReference) {
        self.node_mut(at).add_video(
            reference.video_id,
            reference.offset_seconds,
            reference.game_id,
        );
    }

    /// Node-wise union of `other` into `self`.
    pub fn merge(&mut self, other: PositionGraph) -> Vec<MergeIntegrityWarning> {
        let mut warnings = Vec::new();
        for (key, node) in other.nodes {
            match self.nodes.get_mut(&key) {
                Some(existing) => warnings.extend(existing.merge(&key, node)),
                None => {
                    self.nodes.insert(key, node);
                }
            }
        }
        warnings
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes.iter().flat_map(|(from, node)| {
            node.edges.iter().map(move |(key, to)| Edge {
                from: from.clone(),
                san: key.san.clone(),
                role: key.role,
                to: to.clone(),
            })
        })
    }
}
