// src/tree/mod.rs

//! The per-run job forest.
//!
//! The forest is an arena: nodes live in a vector and reference each other
//! by index, which keeps the (potentially cyclic) dependency graph free of
//! ownership gymnastics. [`builder`] materializes the forest reachable from
//! the run's targets; [`cycles`] marks every dependency cycle afterwards.

pub mod builder;
pub mod cycles;

pub use builder::{DepCache, TreeBuilder};
pub use cycles::find_cycles;

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::BuildError;
use crate::job::Job;

/// Index of a node within its [`Forest`].
pub type NodeId = usize;

/// Per-target execution state for one job.
pub struct TreeNode {
    pub(crate) name: String,
    pub(crate) job: Option<Arc<dyn Job>>,
    /// Direct dependencies, in the order reported by `Job::dependencies`.
    pub(crate) deps: Vec<NodeId>,
    /// First resolution or cycle error attached to this node; `None` means
    /// the node is runnable.
    pub(crate) err: Option<BuildError>,
    pub(crate) started: bool,
    pub(crate) finished: bool,
}

impl TreeNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[NodeId] {
        &self.deps
    }

    pub fn job(&self) -> Option<Arc<dyn Job>> {
        self.job.clone()
    }

    pub fn err(&self) -> Option<&BuildError> {
        self.err.as_ref()
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// The set of nodes built for one run, keyed by job name.
///
/// Each name appears at most once; shared dependencies share a node.
#[derive(Default)]
pub struct Forest {
    nodes: Vec<TreeNode>,
    index: HashMap<String, NodeId>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }

    /// Insert a fresh, unresolved node for `name` and return its id.
    pub(crate) fn insert(&mut self, name: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            name: name.to_string(),
            job: None,
            deps: Vec::new(),
            err: None,
            started: false,
            finished: false,
        });
        self.index.insert(name.to_string(), id);
        id
    }
}
