use crate::domain::errors::{GraphError, Result};
use crate::domain::model::{
    merge_symbols, CallSiteRecord, DerivedEdges, FileRecord, GraphSnapshot, SymbolRecord,
};
use dashmap::DashMap;
use sled::Db;
use std::sync::{Arc, RwLock};

/// Separator between project id and file path in disk-store keys. Project
/// ids and canonical paths never contain it.
const KEY_SEP: u8 = 0x1f;

/// Trait for graph storage backends.
/// Implementations must be thread-safe (Send + Sync).
///
/// Mutations are atomic per file: a reader never observes a half-replaced
/// file subgraph. Derived edges are only ever swapped wholesale.
pub trait GraphStore: Send + Sync {
    /// Atomically replace the subgraph owned by (project, path).
    fn ingest_file(
        &self,
        project: &str,
        path: &str,
        symbols: Vec<SymbolRecord>,
        call_sites: Vec<CallSiteRecord>,
    ) -> Result<()>;

    /// Remove a file's subgraph, cascading removal of incident derived
    /// edges. Returns false if the file was not present.
    fn delete_file(&self, project: &str, path: &str) -> Result<bool>;

    /// Remove everything under a project id. Returns false if unknown.
    fn delete_project(&self, project: &str) -> Result<bool>;

    /// Remove every project. Irreversible; callers must require explicit
    /// confirmation before invoking this.
    fn clear_all(&self) -> Result<()>;

    fn list_projects(&self) -> Result<Vec<String>>;

    fn contains_project(&self, project: &str) -> Result<bool>;

    fn file_record(&self, project: &str, path: &str) -> Result<Option<FileRecord>>;

    fn list_symbols(&self, project: &str, path: &str) -> Result<Vec<SymbolRecord>>;

    fn get_symbol(&self, project: &str, path: &str, name: &str) -> Result<Option<SymbolRecord>>;

    /// All file records of a project, sorted by path for determinism.
    fn all_files(&self, project: &str) -> Result<Vec<(String, FileRecord)>>;

    fn derived_edges(&self, project: &str) -> Result<DerivedEdges>;

    /// The linker's wholesale swap. Replacing the full set (rather than
    /// patching it) is what makes re-linking idempotent.
    fn replace_derived_edges(&self, project: &str, edges: DerivedEdges) -> Result<()>;

    /// Side-effect-free dump of all nodes and edges for visualization.
    fn export(&self, project: &str) -> Result<GraphSnapshot>;
}

// ============================================================================
// MemoryGraphStore - DashMap-sharded in-memory storage
// ============================================================================

#[derive(Default)]
struct ProjectShard {
    files: DashMap<String, FileRecord>,
    edges: RwLock<DerivedEdges>,
}

/// In-memory backend. One shard per project; file replacement is a single
/// map insert, so readers see either the old or the new record, never a mix.
#[derive(Default)]
pub struct MemoryGraphStore {
    projects: DashMap<String, Arc<ProjectShard>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, project: &str) -> Option<Arc<ProjectShard>> {
        self.projects.get(project).map(|s| Arc::clone(s.value()))
    }

    fn shard_or_create(&self, project: &str) -> Arc<ProjectShard> {
        Arc::clone(
            self.projects
                .entry(project.to_string())
                .or_default()
                .value(),
        )
    }
}

impl GraphStore for MemoryGraphStore {
    fn ingest_file(
        &self,
        project: &str,
        path: &str,
        symbols: Vec<SymbolRecord>,
        call_sites: Vec<CallSiteRecord>,
    ) -> Result<()> {
        let shard = self.shard_or_create(project);
        let record = FileRecord {
            symbols: merge_symbols(symbols),
            call_sites,
        };
        // Drop derived edges touching the old subgraph first; the linker
        // recomputes the full set after the batch commits.
        shard
            .edges
            .write()
            .expect("edges lock poisoned")
            .prune_file(path);
        shard.files.insert(path.to_string(), record);
        Ok(())
    }

    fn delete_file(&self, project: &str, path: &str) -> Result<bool> {
        let Some(shard) = self.shard(project) else {
            return Ok(false);
        };
        let existed = shard.files.remove(path).is_some();
        if existed {
            shard
                .edges
                .write()
                .expect("edges lock poisoned")
                .prune_file(path);
        }
        Ok(existed)
    }

    fn delete_project(&self, project: &str) -> Result<bool> {
        Ok(self.projects.remove(project).is_some())
    }

    fn clear_all(&self) -> Result<()> {
        self.projects.clear();
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.projects.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    fn contains_project(&self, project: &str) -> Result<bool> {
        Ok(self.projects.contains_key(project))
    }

    fn file_record(&self, project: &str, path: &str) -> Result<Option<FileRecord>> {
        Ok(self
            .shard(project)
            .and_then(|s| s.files.get(path).map(|r| r.value().clone())))
    }

    fn list_symbols(&self, project: &str, path: &str) -> Result<Vec<SymbolRecord>> {
        Ok(self
            .file_record(project, path)?
            .map(|r| r.symbols)
            .unwrap_or_default())
    }

    fn get_symbol(&self, project: &str, path: &str, name: &str) -> Result<Option<SymbolRecord>> {
        Ok(self
            .file_record(project, path)?
            .and_then(|r| r.symbols.into_iter().find(|s| s.name == name)))
    }

    fn all_files(&self, project: &str) -> Result<Vec<(String, FileRecord)>> {
        let Some(shard) = self.shard(project) else {
            return Ok(Vec::new());
        };
        let mut files: Vec<(String, FileRecord)> = shard
            .files
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    fn derived_edges(&self, project: &str) -> Result<DerivedEdges> {
        Ok(self
            .shard(project)
            .map(|s| s.edges.read().expect("edges lock poisoned").clone())
            .unwrap_or_default())
    }

    fn replace_derived_edges(&self, project: &str, edges: DerivedEdges) -> Result<()> {
        let shard = self.shard_or_create(project);
        *shard.edges.write().expect("edges lock poisoned") = edges;
        Ok(())
    }

    fn export(&self, project: &str) -> Result<GraphSnapshot> {
        if !self.contains_project(project)? {
            return Err(GraphError::ProjectNotFound(project.to_string()));
        }
        Ok(GraphSnapshot {
            project: project.to_string(),
            files: self.all_files(project)?,
            edges: self.derived_edges(project)?,
        })
    }
}

// ============================================================================
// DiskGraphStore - sled-backed storage surviving restarts
// ============================================================================

/// Disk backend using sled trees with bincode-encoded records:
/// - `projects` - registered project ids
/// - `files`    - (project, path) -> FileRecord
/// - `edges`    - project -> DerivedEdges
pub struct DiskGraphStore {
    #[allow(dead_code)]
    db: Db,
    projects_tree: sled::Tree,
    files_tree: sled::Tree,
    edges_tree: sled::Tree,
}

impl DiskGraphStore {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let db = sled::open(path)?;
        let projects_tree = db.open_tree("projects")?;
        let files_tree = db.open_tree("files")?;
        let edges_tree = db.open_tree("edges")?;

        Ok(Self {
            db,
            projects_tree,
            files_tree,
            edges_tree,
        })
    }

    fn file_key(project: &str, path: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(project.len() + path.len() + 1);
        key.extend_from_slice(project.as_bytes());
        key.push(KEY_SEP);
        key.extend_from_slice(path.as_bytes());
        key
    }

    fn project_prefix(project: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(project.len() + 1);
        prefix.extend_from_slice(project.as_bytes());
        prefix.push(KEY_SEP);
        prefix
    }

    fn decode_file(bytes: &[u8]) -> Result<FileRecord> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Atomic read-modify-write dropping a file's incident derived edges.
    fn prune_edges_for(&self, project: &str, path: &str) -> Result<()> {
        self.edges_tree
            .update_and_fetch(project.as_bytes(), |old| {
                let mut edges: DerivedEdges = old
                    .and_then(|b| bincode::deserialize(b).ok())
                    .unwrap_or_default();
                edges.prune_file(path);
                bincode::serialize(&edges)
                    .ok()
                    .or_else(|| old.map(|b| b.to_vec()))
            })?;
        Ok(())
    }
}

impl GraphStore for DiskGraphStore {
    fn ingest_file(
        &self,
        project: &str,
        path: &str,
        symbols: Vec<SymbolRecord>,
        call_sites: Vec<CallSiteRecord>,
    ) -> Result<()> {
        let record = FileRecord {
            symbols: merge_symbols(symbols),
            call_sites,
        };
        let bytes = bincode::serialize(&record)?;

        self.projects_tree.insert(project.as_bytes(), &[])?;
        self.prune_edges_for(project, path)?;
        self.files_tree
            .insert(Self::file_key(project, path), bytes)?;
        Ok(())
    }

    fn delete_file(&self, project: &str, path: &str) -> Result<bool> {
        let existed = self
            .files_tree
            .remove(Self::file_key(project, path))?
            .is_some();
        if existed {
            self.prune_edges_for(project, path)?;
        }
        Ok(existed)
    }

    fn delete_project(&self, project: &str) -> Result<bool> {
        let existed = self.projects_tree.remove(project.as_bytes())?.is_some();
        self.edges_tree.remove(project.as_bytes())?;

        let keys: Vec<sled::IVec> = self
            .files_tree
            .scan_prefix(Self::project_prefix(project))
            .keys()
            .collect::<std::result::Result<_, _>>()?;
        for key in keys {
            self.files_tree.remove(key)?;
        }
        Ok(existed)
    }

    fn clear_all(&self) -> Result<()> {
        self.projects_tree.clear()?;
        self.files_tree.clear()?;
        self.edges_tree.clear()?;
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in self.projects_tree.iter() {
            let (key, _) = entry?;
            ids.push(String::from_utf8_lossy(&key).into_owned());
        }
        ids.sort();
        Ok(ids)
    }

    fn contains_project(&self, project: &str) -> Result<bool> {
        Ok(self.projects_tree.contains_key(project.as_bytes())?)
    }

    fn file_record(&self, project: &str, path: &str) -> Result<Option<FileRecord>> {
        match self.files_tree.get(Self::file_key(project, path))? {
            Some(bytes) => Ok(Some(Self::decode_file(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_symbols(&self, project: &str, path: &str) -> Result<Vec<SymbolRecord>> {
        Ok(self
            .file_record(project, path)?
            .map(|r| r.symbols)
            .unwrap_or_default())
    }

    fn get_symbol(&self, project: &str, path: &str, name: &str) -> Result<Option<SymbolRecord>> {
        Ok(self
            .file_record(project, path)?
            .and_then(|r| r.symbols.into_iter().find(|s| s.name == name)))
    }

    fn all_files(&self, project: &str) -> Result<Vec<(String, FileRecord)>> {
        let prefix = Self::project_prefix(project);
        let mut files = Vec::new();
        for entry in self.files_tree.scan_prefix(&prefix) {
            let (key, bytes) = entry?;
            let path = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            files.push((path, Self::decode_file(&bytes)?));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    fn derived_edges(&self, project: &str) -> Result<DerivedEdges> {
        match self.edges_tree.get(project.as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(DerivedEdges::default()),
        }
    }

    fn replace_derived_edges(&self, project: &str, edges: DerivedEdges) -> Result<()> {
        let bytes = bincode::serialize(&edges)?;
        self.projects_tree.insert(project.as_bytes(), &[])?;
        self.edges_tree.insert(project.as_bytes(), bytes)?;
        Ok(())
    }

    fn export(&self, project: &str) -> Result<GraphSnapshot> {
        if !self.contains_project(project)? {
            return Err(GraphError::ProjectNotFound(project.to_string()));
        }
        Ok(GraphSnapshot {
            project: project.to_string(),
            files: self.all_files(project)?,
            edges: self.derived_edges(project)?,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
