/// Concurrency management for Ripplemap.
/// Thread-pool setup plus the per-project reader/linker exclusion.
use anyhow::Result;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};

/// Initialize the global rayon thread pool with controlled worker count.
/// Reserves ~50% of CPU capacity so a host editor/CI stays responsive.
pub fn init_thread_pool() -> Result<()> {
    let cores = num_cpus::get();
    let workers = std::cmp::max(1, cores / 2);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    tracing::info!(workers, cores, "initialized thread pool");
    Ok(())
}

/// One RwLock per project:
/// - impact queries and exports take the read side (parallel among
///   themselves);
/// - mutating batches (ingest + link, file deletion) take the write side,
///   which is both the phase-1/phase-2 barrier (every ingestion of the
///   batch has settled before linking starts) and the guarantee that no
///   query observes a half-swapped derived-edge set. File-level
///   parallelism happens inside the batch, under the one write guard.
///
/// Different projects never contend.
#[derive(Default)]
pub struct ProjectLocks {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding a project, created on first use.
    pub fn for_project(&self, project: &str) -> Arc<RwLock<()>> {
        Arc::clone(
            self.locks
                .entry(project.to_string())
                .or_default()
                .value(),
        )
    }
}
