//! Impact (blast-radius) traversal.
//!
//! Given a changed file, walks dependency edges inbound: who depends on the
//! symbols this file defines? Mutual recursion makes the dependency graph
//! cyclic, so the walk keeps a visited set; depth and result-count limits
//! bound the worst case on highly connected graphs.

use crate::domain::errors::{GraphError, Result};
use crate::domain::model::{DependsEdge, SymbolId, SymbolKind};
use crate::domain::store::GraphStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Bounds for one traversal. Both limits are mandatory; `max_depth: 1`
/// reports direct callers only, larger values walk the transitive closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    pub max_depth: usize,
    pub max_results: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_results: 100,
        }
    }
}

/// One affected symbol, deduplicated by (file, symbol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub file: String,
    pub symbol: String,
    pub symbol_type: SymbolKind,
    pub line: u32,
    pub depends_on: String,
}

/// The answer to "what breaks if this file changes?". An empty dependents
/// list is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub changed_file: String,
    pub defined_symbols: Vec<String>,
    pub dependents: Vec<Dependent>,
}

/// Read-only query engine over the store's derived edges.
pub struct ImpactEngine<'a> {
    store: &'a dyn GraphStore,
    limits: TraversalLimits,
}

impl<'a> ImpactEngine<'a> {
    pub fn new(store: &'a dyn GraphStore, limits: TraversalLimits) -> Self {
        Self { store, limits }
    }

    /// Compute the bounded set of dependents for (project, path).
    ///
    /// Callers must hold the project's read lock so the walk never observes
    /// a half-swapped edge set from a concurrent re-link.
    pub fn impact(&self, project: &str, path: &str) -> Result<ImpactReport> {
        if !self.store.contains_project(project)? {
            return Err(GraphError::ProjectNotFound(project.to_string()));
        }

        let roots = self.store.list_symbols(project, path)?;
        let defined_symbols: Vec<String> = roots.iter().map(|s| s.name.clone()).collect();

        let edges = self.store.derived_edges(project)?;
        let mut inbound: HashMap<&SymbolId, Vec<&DependsEdge>> = HashMap::new();
        for edge in &edges.depends_on {
            inbound.entry(&edge.target).or_default().push(edge);
        }

        let mut visited: HashSet<SymbolId> = HashSet::new();
        let mut queue: VecDeque<(SymbolId, usize)> = VecDeque::new();
        for root in &defined_symbols {
            let id = SymbolId::new(path.to_string(), root.clone());
            visited.insert(id.clone());
            queue.push_back((id, 0));
        }

        let mut dependents: Vec<Dependent> = Vec::new();

        'walk: while let Some((node, depth)) = queue.pop_front() {
            if depth >= self.limits.max_depth {
                continue;
            }
            let Some(callers) = inbound.get(&node) else {
                continue;
            };
            for edge in callers {
                let caller = edge.source.clone();
                if !visited.insert(caller.clone()) {
                    continue;
                }
                if dependents.len() >= self.limits.max_results {
                    break 'walk;
                }
                dependents.push(self.describe(project, &caller, &node.name)?);
                queue.push_back((caller, depth + 1));
            }
        }

        Ok(ImpactReport {
            changed_file: path.to_string(),
            defined_symbols,
            dependents,
        })
    }

    /// Resolve a caller id back to its definition. A caller that cannot be
    /// resolved means a derived edge outlived its node, which the store is
    /// supposed to make impossible.
    fn describe(&self, project: &str, caller: &SymbolId, depends_on: &str) -> Result<Dependent> {
        let Some(record) = self
            .store
            .get_symbol(project, &caller.file, &caller.name)?
        else {
            debug_assert!(
                false,
                "dependency edge references missing symbol {}::{}",
                caller.file, caller.name
            );
            return Err(GraphError::Consistency(format!(
                "edge references missing symbol '{}' in '{}'",
                caller.name, caller.file
            )));
        };

        Ok(Dependent {
            file: caller.file.clone(),
            symbol: caller.name.clone(),
            symbol_type: record.kind,
            line: record.line,
            depends_on: depends_on.to_string(),
        })
    }
}
