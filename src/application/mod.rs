//! Use-case layer: wires the store, the per-project locks, and the engines
//! into the operations callers actually invoke. The locking discipline
//! lives here so the CLI and the TCP server cannot get it wrong
//! independently.

use crate::api::dto::AnalysisReportDto;
use crate::domain::errors::Result;
use crate::domain::linker::{LinkStats, Linker};
use crate::domain::model::{GraphSnapshot, IngestStats};
use crate::domain::store::GraphStore;
use crate::domain::traversal::{ImpactEngine, ImpactReport};
use crate::infrastructure::concurrency::ProjectLocks;
use crate::infrastructure::config::Config;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one ingest-and-link batch.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchSummary {
    pub files: usize,
    pub ingest: IngestStats,
    pub link: LinkStats,
}

/// Shared application state. Cheap to share across server threads.
pub struct App {
    store: Arc<dyn GraphStore>,
    locks: ProjectLocks,
    config: Config,
}

impl App {
    pub fn new(store: Arc<dyn GraphStore>, config: Config) -> App {
        App {
            store,
            locks: ProjectLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest a batch of parser reports for one project, then re-link.
    ///
    /// The whole batch holds the project's write lock: queries never see a
    /// half-ingested batch, and by the time phase 2 starts every phase-1
    /// file has committed (the hard barrier). Within the batch, files are
    /// independent and ingest in parallel. Per-entry data errors were
    /// already absorbed into the stats by DTO validation; a store failure
    /// here is an outage and propagates.
    pub fn ingest_batch(
        &self,
        project: &str,
        reports: Vec<AnalysisReportDto>,
    ) -> Result<BatchSummary> {
        let lock = self.locks.for_project(project);
        let _guard = lock.write().expect("project lock poisoned");

        let mut summary = BatchSummary {
            files: reports.len(),
            ..BatchSummary::default()
        };

        let results: Vec<Result<IngestStats>> = reports
            .into_par_iter()
            .map(|report| {
                let (symbols, calls, stats) = report.data.into_records();
                self.store
                    .ingest_file(project, &report.filename, symbols, calls)?;
                Ok(stats)
            })
            .collect();
        for result in results {
            summary.ingest.absorb(result?);
        }

        summary.link = self.link_locked(project)?;

        if summary.ingest.skipped() > 0 {
            tracing::warn!(
                project,
                skipped = summary.ingest.skipped(),
                "batch contained malformed entries"
            );
        }

        Ok(summary)
    }

    /// Remove a file's subgraph and re-link the project.
    pub fn delete_file(&self, project: &str, path: &str) -> Result<bool> {
        let lock = self.locks.for_project(project);
        let _guard = lock.write().expect("project lock poisoned");

        let removed = self.store.delete_file(project, path)?;
        if removed {
            self.link_locked(project)?;
        }
        Ok(removed)
    }

    /// Blast-radius query. Read lock only; never runs during a re-link.
    pub fn impact(
        &self,
        project: &str,
        path: &str,
        depth: Option<usize>,
    ) -> Result<ImpactReport> {
        let lock = self.locks.for_project(project);
        let _guard = lock.read().expect("project lock poisoned");

        let mut limits = self.config.traversal;
        if let Some(depth) = depth {
            limits.max_depth = depth;
        }
        ImpactEngine::new(self.store.as_ref(), limits).impact(project, path)
    }

    /// Side-effect-free dump for visualization.
    pub fn export(&self, project: &str) -> Result<GraphSnapshot> {
        let lock = self.locks.for_project(project);
        let _guard = lock.read().expect("project lock poisoned");
        self.store.export(project)
    }

    pub fn projects(&self) -> Result<Vec<String>> {
        self.store.list_projects()
    }

    pub fn clear_project(&self, project: &str) -> Result<bool> {
        let lock = self.locks.for_project(project);
        let _guard = lock.write().expect("project lock poisoned");
        self.store.delete_project(project)
    }

    /// Wipe every project. Irreversible; both front ends demand an explicit
    /// confirmation before calling this.
    pub fn clear_all(&self) -> Result<()> {
        self.store.clear_all()
    }

    /// Run a link pass. The caller must already hold the project's write
    /// lock; the lock is not re-entrant.
    fn link_locked(&self, project: &str) -> Result<LinkStats> {
        let matcher = self.config.stitching.matcher();
        Linker::new(self.store.as_ref(), self.config.ambiguity, matcher.as_ref())
            .link_project(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{AnalysisReportDto, FileAnalysisDto};
    use crate::domain::store::MemoryGraphStore;

    fn report(filename: &str, data: serde_json::Value) -> AnalysisReportDto {
        AnalysisReportDto {
            filename: filename.to_string(),
            data: serde_json::from_value::<FileAnalysisDto>(data).unwrap(),
        }
    }

    fn app() -> App {
        App::new(Arc::new(MemoryGraphStore::new()), Config::default())
    }

    #[test]
    fn test_batch_ingest_links_across_files() {
        let app = app();
        let summary = app
            .ingest_batch(
                "p1",
                vec![
                    report(
                        "api.py",
                        serde_json::json!({
                            "definitions": [{"type": "function", "name": "login_endpoint", "line": 5}],
                            "calls": [{"name": "authenticate_user", "parent": "login_endpoint", "line": 6}]
                        }),
                    ),
                    report(
                        "auth.py",
                        serde_json::json!({
                            "definitions": [{"type": "function", "name": "authenticate_user", "line": 2}],
                            "calls": [{"name": "validate_token", "parent": "authenticate_user", "line": 3}]
                        }),
                    ),
                ],
            )
            .unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.ingest.symbols, 2);
        assert_eq!(summary.link.resolved, 1);

        let impact = app.impact("p1", "auth.py", None).unwrap();
        assert_eq!(impact.dependents.len(), 1);
        assert_eq!(impact.dependents[0].symbol, "login_endpoint");
        assert_eq!(impact.dependents[0].file, "api.py");
        assert_eq!(impact.dependents[0].line, 5);
        assert_eq!(impact.dependents[0].depends_on, "authenticate_user");
    }

    #[test]
    fn test_rename_invalidates_old_dependency() {
        let app = app();
        app.ingest_batch(
            "p1",
            vec![
                report(
                    "api.py",
                    serde_json::json!({
                        "definitions": [{"type": "function", "name": "login_endpoint", "line": 5}],
                        "calls": [{"name": "authenticate_user", "parent": "login_endpoint", "line": 6}]
                    }),
                ),
                report(
                    "auth.py",
                    serde_json::json!({
                        "definitions": [{"type": "function", "name": "authenticate_user", "line": 2}]
                    }),
                ),
            ],
        )
        .unwrap();
        assert_eq!(app.impact("p1", "auth.py", None).unwrap().dependents.len(), 1);

        // Re-ingest auth.py with the function renamed.
        app.ingest_batch(
            "p1",
            vec![report(
                "auth.py",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "authenticate", "line": 2}]
                }),
            )],
        )
        .unwrap();

        let impact = app.impact("p1", "auth.py", None).unwrap();
        assert_eq!(impact.defined_symbols, vec!["authenticate".to_string()]);
        assert!(impact.dependents.is_empty());
    }

    #[test]
    fn test_delete_file_relinks() {
        let app = app();
        app.ingest_batch(
            "p1",
            vec![
                report(
                    "a.py",
                    serde_json::json!({
                        "definitions": [{"type": "function", "name": "caller", "line": 1}],
                        "calls": [{"name": "callee", "parent": "caller", "line": 2}]
                    }),
                ),
                report(
                    "b.py",
                    serde_json::json!({
                        "definitions": [{"type": "function", "name": "callee", "line": 1}]
                    }),
                ),
            ],
        )
        .unwrap();

        assert!(app.delete_file("p1", "b.py").unwrap());
        let impact = app.impact("p1", "b.py", None).unwrap();
        assert!(impact.defined_symbols.is_empty());
        assert!(impact.dependents.is_empty());
        // The deleted callee's caller is fully unlinked again.
        assert_eq!(app.export("p1").unwrap().edges.edge_count(), 0);
    }
}
