//! Merge/dedup engine: folds per-game graphs into the run's single graph.
//!
//! Two strategies, same result: [`MergeEngine`] is a single writer folding
//! graphs into a [`PositionStore`] one at a time, and [`reduce_graphs`] is a
//! rayon tree reduction. Both rest on node-wise union, which is associative and
//! commutative.

use chess_core::{MergeIntegrityWarning, PositionGraph};
use rayon::prelude::*;

use crate::store::PositionStore;

pub struct MergeEngine<S: PositionStore = PositionGraph> {
    store: S,
    warnings: Vec<MergeIntegrityWarning>,
    graphs_folded: usize,
}

/// What the engine hands over once merging is done.
pub struct MergeOutput<S> {
    pub store: S,
    /// Sorted and deduplicated.
    pub warnings: Vec<MergeIntegrityWarning>,
    pub graphs_folded: usize,
}

impl Default for MergeEngine<PositionGraph> {
    fn default() -> Self {
        Self::new(PositionGraph::new())
    }
}

impl<S: PositionStore> MergeEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            warnings: Vec::new(),
            graphs_folded: 0,
        }
    }

    /// Fold one complete graph in. A graph is either folded entirely or not at
    /// all, so stopping between calls leaves a consistent store.
    pub fn fold(&mut self, graph: PositionGraph) {
        for (key, node) in graph.nodes {
            let warnings = self.store.merge_node(key, node);
            for w in &warnings {
                tracing::warn!(
                    position = %w.position,
                    san = %w.san,
                    kept = %w.kept,
                    rejected = %w.rejected,
                    "conflicting destinations for the same edge"
                );
            }
            self.warnings.extend(warnings);
        }
        self.graphs_folded += 1;
    }

    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = MergeIntegrityWarning>) {
        self.warnings.extend(warnings);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn graphs_folded(&self) -> usize {
        self.graphs_folded
    }

    pub fn finish(self) -> MergeOutput<S> {
        MergeOutput {
            store: self.store,
            warnings: normalize_warnings(self.warnings),
            graphs_folded: self.graphs_folded,
        }
    }
}

/// Tree-reduce graphs on the current rayon pool.
pub fn reduce_graphs(graphs: Vec<PositionGraph>) -> (PositionGraph, Vec<MergeIntegrityWarning>) {
    let (graph, warnings) = graphs
        .into_par_iter()
        .map(|g| (g, Vec::new()))
        .reduce(
            || (PositionGraph::new(), Vec::new()),
            |(mut a, mut warnings_a), (mut b, warnings_b)| {
                // Fold the smaller side into the larger.
                if a.len() < b.len() {
                    std::mem::swap(&mut a, &mut b);
                }
                warnings_a.extend(warnings_b);
                warnings_a.extend(a.merge(b));
                (a, warnings_a)
            },
        );
    (graph, normalize_warnings(warnings))
}

fn normalize_warnings(mut warnings: Vec<MergeIntegrityWarning>) -> Vec<MergeIntegrityWarning> {
    warnings.sort();
    warnings.dedup();
    warnings
}
