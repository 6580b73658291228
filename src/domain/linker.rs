//! Call-site resolution (linking).
//!
//! Phase 1 (ingestion) must have committed every file of the batch before
//! this runs: a call site in file B may target a definition in file A, and
//! ingestion order is not guaranteed. Phase 2 then resolves every call site
//! in the project against a freshly built name index and swaps the derived
//! edge set wholesale, which makes re-linking idempotent by construction.

use crate::domain::errors::Result;
use crate::domain::model::{
    CallSiteId, CallSiteRecord, DependsEdge, DerivedEdges, EdgeProvenance, FileRecord, MetaValue,
    SymbolId, SymbolKind, TargetEdge,
};
use crate::domain::stitcher::{EndpointMatcher, UnresolvedCall};
use crate::domain::store::GraphStore;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// What to do when several same-named definitions match one call site.
///
/// `FanOut` links the call site to every candidate (the permissive default;
/// favors recall and over-reports impact). `FirstOnly` links only the
/// candidate in the lexicographically first file, trading false positives
/// for false negatives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    #[default]
    FanOut,
    FirstOnly,
}

/// Candidate view of one definition, used during resolution and stitching.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub line: u32,
    pub metadata: BTreeMap<String, MetaValue>,
}

/// Project-wide name -> candidate definitions index.
/// Built in parallel at link time; never persisted.
#[derive(Default)]
pub struct NameIndex {
    by_name: DashMap<String, Vec<SymbolEntry>>,
}

impl NameIndex {
    /// Build the index from a project's file records in parallel.
    pub fn build(files: &[(String, FileRecord)]) -> NameIndex {
        let index = NameIndex::default();

        files.par_iter().for_each(|(path, record)| {
            for sym in &record.symbols {
                index
                    .by_name
                    .entry(sym.name.clone())
                    .or_default()
                    .push(SymbolEntry {
                        id: SymbolId::new(path.clone(), sym.name.clone()),
                        kind: sym.kind,
                        line: sym.line,
                        metadata: sym.metadata.clone(),
                    });
            }
        });

        // Candidate order must not depend on thread scheduling.
        for mut entry in index.by_name.iter_mut() {
            entry.value_mut().sort_by(|a, b| a.id.cmp(&b.id));
        }

        index
    }

    /// Candidates for a callee name. Cloned to avoid holding map locks.
    pub fn candidates(&self, name: &str) -> Vec<SymbolEntry> {
        self.by_name
            .get(name)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// All entries satisfying a predicate, in deterministic order.
    pub fn entries_where<F: Fn(&SymbolEntry) -> bool>(&self, pred: F) -> Vec<SymbolEntry> {
        let mut out: Vec<SymbolEntry> = self
            .by_name
            .iter()
            .flat_map(|e| {
                e.value()
                    .iter()
                    .filter(|s| pred(s))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn len(&self) -> usize {
        self.by_name.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Outcome counters for one linking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LinkStats {
    pub call_sites: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub dangling: usize,
    pub stitched: usize,
    pub target_edges: usize,
    pub depends_edges: usize,
}

/// The phase-2 resolution engine. Callers must hold the project's write
/// lock for the duration of `link_project`: the pass has to see a stable
/// snapshot and queries must not observe half-swapped edges.
pub struct Linker<'a> {
    store: &'a dyn GraphStore,
    policy: AmbiguityPolicy,
    matcher: &'a dyn EndpointMatcher,
}

struct SiteResolution {
    targets: Vec<TargetEdge>,
    depends: Vec<DependsEdge>,
    ambiguous: bool,
}

impl<'a> Linker<'a> {
    pub fn new(
        store: &'a dyn GraphStore,
        policy: AmbiguityPolicy,
        matcher: &'a dyn EndpointMatcher,
    ) -> Self {
        Self {
            store,
            policy,
            matcher,
        }
    }

    /// Recompute the full derived-edge set for a project and swap it in.
    pub fn link_project(&self, project: &str) -> Result<LinkStats> {
        let files = self.store.all_files(project)?;
        let index = NameIndex::build(&files);

        // Enclosing-symbol attributions are only valid against definitions
        // that actually exist; a parser may report a parent that was skipped.
        let defined: HashSet<SymbolId> = files
            .iter()
            .flat_map(|(path, record)| {
                record
                    .symbols
                    .iter()
                    .map(|s| SymbolId::new(path.clone(), s.name.clone()))
            })
            .collect();

        let sites: Vec<(&String, &CallSiteRecord)> = files
            .iter()
            .flat_map(|(path, record)| record.call_sites.iter().map(move |c| (path, c)))
            .collect();

        let resolutions: Vec<SiteResolution> = sites
            .par_iter()
            .map(|(file, site)| self.resolve_site(file.as_str(), site, &index, &defined))
            .collect();

        let mut stats = LinkStats {
            call_sites: sites.len(),
            ..LinkStats::default()
        };
        let mut edges = DerivedEdges::default();
        let mut seen_depends: HashSet<DependsEdge> = HashSet::new();

        for resolution in &resolutions {
            if resolution.ambiguous {
                stats.ambiguous += 1;
            }
            if resolution.targets.is_empty() {
                continue;
            }
            stats.resolved += 1;
            edges.targets.extend(resolution.targets.iter().cloned());
            for dep in &resolution.depends {
                if seen_depends.insert(dep.clone()) {
                    edges.depends_on.push(dep.clone());
                }
            }
        }

        // Stitch pass: only call sites that stayed dangling are eligible.
        let endpoints = self.matcher.endpoint_pool(&index);
        for (resolution, (file, site)) in resolutions.iter().zip(&sites) {
            if !resolution.targets.is_empty() {
                continue;
            }
            let call = UnresolvedCall {
                file: file.as_str(),
                site: *site,
            };
            let matched = self.matcher.match_call(&call, &endpoints);
            if matched.is_empty() {
                stats.dangling += 1;
                continue;
            }
            stats.stitched += 1;
            let call_id = CallSiteId {
                file: (*file).clone(),
                line: site.line,
                callee: site.callee.clone(),
            };
            for target in matched {
                edges.targets.push(TargetEdge {
                    call: call_id.clone(),
                    target: target.clone(),
                    provenance: EdgeProvenance::Endpoint,
                });
                if let Some(enclosing) = &site.enclosing {
                    let source = SymbolId::new((*file).clone(), enclosing.clone());
                    if defined.contains(&source) {
                        let dep = DependsEdge {
                            source,
                            target,
                            provenance: EdgeProvenance::Endpoint,
                        };
                        if seen_depends.insert(dep.clone()) {
                            edges.depends_on.push(dep);
                        }
                    }
                }
            }
        }

        stats.target_edges = edges.targets.len();
        stats.depends_edges = edges.depends_on.len();

        tracing::debug!(
            project,
            call_sites = stats.call_sites,
            resolved = stats.resolved,
            stitched = stats.stitched,
            dangling = stats.dangling,
            "link pass complete"
        );

        self.store.replace_derived_edges(project, edges)?;
        Ok(stats)
    }

    fn resolve_site(
        &self,
        file: &str,
        site: &CallSiteRecord,
        index: &NameIndex,
        defined: &HashSet<SymbolId>,
    ) -> SiteResolution {
        let mut candidates = index.candidates(&site.callee);
        let ambiguous = candidates.len() > 1;

        if ambiguous && self.policy == AmbiguityPolicy::FirstOnly {
            candidates.truncate(1);
        }

        let call_id = CallSiteId {
            file: file.to_string(),
            line: site.line,
            callee: site.callee.clone(),
        };

        let mut targets = Vec::with_capacity(candidates.len());
        let mut depends = Vec::new();

        for candidate in candidates {
            targets.push(TargetEdge {
                call: call_id.clone(),
                target: candidate.id.clone(),
                provenance: EdgeProvenance::Call,
            });
            // Top-level call sites get TARGETS only: there is no owning
            // symbol to attribute the dependency to.
            if let Some(enclosing) = &site.enclosing {
                let source = SymbolId::new(file.to_string(), enclosing.clone());
                if defined.contains(&source) && source != candidate.id {
                    depends.push(DependsEdge {
                        source,
                        target: candidate.id,
                        provenance: EdgeProvenance::Call,
                    });
                }
            }
        }

        SiteResolution {
            targets,
            depends,
            ambiguous,
        }
    }
}
