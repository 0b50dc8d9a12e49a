// src/tree/builder.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::BuildError;
use crate::graph::Graph;
use crate::job::Job;
use crate::tree::{Forest, NodeId};

/// Cached result of resolving one name: the job handle, its dependency list,
/// and whichever error the resolution produced. Written at most once per run
/// and never evicted, so tree construction and cycle reporting always see a
/// consistent view, and `Graph::get_job` / `Job::dependencies` each run at
/// most once per name.
pub struct DepCacheEntry {
    pub job: Option<Arc<dyn Job>>,
    pub deps: Option<Vec<String>>,
    pub err: Option<BuildError>,
}

/// Per-run memoization of dependency lookups, backed by the [`Graph`].
pub struct DepCache<'g> {
    graph: &'g Graph,
    cache: HashMap<String, DepCacheEntry>,
}

impl<'g> DepCache<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            cache: HashMap::new(),
        }
    }

    /// Resolve `name` to its job and dependency list, consulting the cache
    /// first. Errors are cached too.
    pub fn get(&mut self, name: &str) -> &DepCacheEntry {
        if !self.cache.contains_key(name) {
            let entry = match self.graph.get_job(name) {
                Err(err) => DepCacheEntry {
                    job: None,
                    deps: None,
                    err: Some(err),
                },
                Ok(job) => match job.dependencies() {
                    Err(err) => DepCacheEntry {
                        job: Some(job),
                        deps: None,
                        err: Some(BuildError::job(err)),
                    },
                    Ok(deps) => DepCacheEntry {
                        job: Some(job),
                        deps: Some(deps),
                        err: None,
                    },
                },
            };
            self.cache.insert(name.to_string(), entry);
        }
        &self.cache[name]
    }
}

/// Builds the forest of nodes reachable from the run's targets.
///
/// Resolution failures are recorded on the affected node instead of aborting
/// the build, so one bad target does not prevent its siblings from running.
pub struct TreeBuilder<'g> {
    forest: Forest,
    deps: DepCache<'g>,
}

impl<'g> TreeBuilder<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            forest: Forest::new(),
            deps: DepCache::new(graph),
        }
    }

    /// Materialize the node for `name`, creating it and its dependency
    /// subtree if absent.
    ///
    /// The returned error is the node's own resolution error (missing job or
    /// failed dependency listing), or the recorded error of an
    /// already-existing node. Errors accumulated from direct children are
    /// attached to the node but not returned; deeper failures never
    /// propagate past one level.
    pub fn gen_tree(&mut self, name: &str) -> (NodeId, Option<BuildError>) {
        if let Some(id) = self.forest.lookup(name) {
            return (id, self.forest.get(id).err.clone());
        }

        // Insert before resolving anything so cyclic references find the
        // partially built node instead of recursing forever.
        let id = self.forest.insert(name);

        let (job, dep_names, err) = {
            let entry = self.deps.get(name);
            (entry.job.clone(), entry.deps.clone(), entry.err.clone())
        };

        if let Some(err) = err {
            debug!(job = %name, error = %err, "job resolution failed");
            let node = self.forest.get_mut(id);
            node.err = Some(err.clone());
            node.finished = true;
            return (id, Some(err));
        }

        let dep_names = dep_names.unwrap_or_default();
        let mut dep_ids = Vec::with_capacity(dep_names.len());
        let mut child_errs = Vec::new();
        for dep in &dep_names {
            let (dep_id, dep_err) = self.gen_tree(dep);
            if let Some(e) = dep_err {
                child_errs.push(e);
            }
            dep_ids.push(dep_id);
        }

        let node = self.forest.get_mut(id);
        node.job = job;
        node.deps = dep_ids;
        if !child_errs.is_empty() {
            node.err = Some(if child_errs.len() == 1 {
                child_errs.remove(0)
            } else {
                BuildError::Multi(child_errs)
            });
        }

        (id, None)
    }

    pub fn into_forest(self) -> Forest {
        self.forest
    }
}
