// src/tree/cycles.rs

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use tracing::debug;

use crate::errors::BuildError;
use crate::tree::{Forest, NodeId};

/// Locate every dependency cycle in the forest and mark its members.
///
/// A cycle is a strongly connected component of size >= 2, or a single node
/// that depends on itself. Every member whose `err` is still unset gets a
/// [`BuildError::DependencyCycle`] naming the whole component in forest
/// insertion order; nodes that already carry a resolution error keep it.
/// Returns the ids of the nodes that were marked.
pub fn find_cycles(forest: &mut Forest) -> Vec<NodeId> {
    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    for id in forest.ids() {
        graph.add_node(id);
    }
    for id in forest.ids() {
        for &dep in forest.get(id).deps() {
            graph.add_edge(NodeIndex::new(id), NodeIndex::new(dep), ());
        }
    }

    let mut marked = Vec::new();
    for component in tarjan_scc(&graph) {
        let cyclic = component.len() >= 2
            || graph.find_edge(component[0], component[0]).is_some();
        if !cyclic {
            continue;
        }

        let mut members: Vec<NodeId> = component.iter().map(|ix| ix.index()).collect();
        members.sort_unstable();
        let names: Vec<String> = members
            .iter()
            .map(|&id| forest.get(id).name().to_string())
            .collect();
        debug!(cycle = ?names, "dependency cycle detected");

        for &id in &members {
            let node = forest.get_mut(id);
            if node.err.is_none() {
                node.err = Some(BuildError::DependencyCycle(names.clone()));
                marked.push(id);
            }
        }
    }

    marked.sort_unstable();
    marked
}
