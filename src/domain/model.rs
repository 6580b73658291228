use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a named definition. Closed set; every branch on kind is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
}

impl SymbolKind {
    /// Parse a parser-reported kind string ("function" / "class").
    pub fn parse(s: &str) -> Option<SymbolKind> {
        match s {
            "function" => Some(SymbolKind::Function),
            "class" => Some(SymbolKind::Class),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Metadata value attached to a symbol (parameters, docstring, ...).
///
/// A closed enum rather than `serde_json::Value`: stored records go through
/// bincode on the disk backend, which cannot decode self-describing JSON
/// values. Conversion from arbitrary parser JSON is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn from_json(value: &serde_json::Value) -> MetaValue {
        match value {
            serde_json::Value::Null => MetaValue::Null,
            serde_json::Value::Bool(b) => MetaValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MetaValue::Int(i)
                } else {
                    MetaValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => MetaValue::Str(s.clone()),
            serde_json::Value::Array(items) => {
                MetaValue::List(items.iter().map(MetaValue::from_json).collect())
            }
            serde_json::Value::Object(map) => MetaValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), MetaValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A named definition within a file. Unique per (project, file, name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    /// Open key-value bag; parser fields we do not model are preserved here.
    pub metadata: BTreeMap<String, MetaValue>,
}

/// A reference to a name at a source location. May stay unresolved forever;
/// that is a normal state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSiteRecord {
    pub callee: String,
    pub line: u32,
    /// Name of the enclosing definition, if any. Top-level calls have none.
    pub enclosing: Option<String>,
}

/// Everything owned by one (project, path): the file's symbols and call
/// sites. CONTAINS / PERFORMS_CALL edges are implicit in this ownership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub symbols: Vec<SymbolRecord>,
    pub call_sites: Vec<CallSiteRecord>,
}

/// Identity of a symbol inside one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId {
    pub file: String,
    pub name: String,
}

impl SymbolId {
    pub fn new(file: impl Into<String>, name: impl Into<String>) -> SymbolId {
        SymbolId {
            file: file.into(),
            name: name.into(),
        }
    }
}

/// Identity of a call site inside one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSiteId {
    pub file: String,
    pub line: u32,
    pub callee: String,
}

/// Where a derived edge came from: ordinary name resolution or the
/// cross-language stitcher. Traversal treats both identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeProvenance {
    Call,
    Endpoint,
}

/// CallSite -> Symbol resolution edge (TARGETS / CALLS_ENDPOINT).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetEdge {
    pub call: CallSiteId,
    pub target: SymbolId,
    pub provenance: EdgeProvenance,
}

/// Symbol -> Symbol dependency edge, derived from
/// enclosing(call site) -> target(call site).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependsEdge {
    pub source: SymbolId,
    pub target: SymbolId,
    pub provenance: EdgeProvenance,
}

/// The complete derived-edge set for a project. Always recomputed and
/// swapped wholesale by the linker; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedEdges {
    pub targets: Vec<TargetEdge>,
    pub depends_on: Vec<DependsEdge>,
}

impl DerivedEdges {
    pub fn edge_count(&self) -> usize {
        self.targets.len() + self.depends_on.len()
    }

    /// Drop every edge with an endpoint in the given file. Used by the store
    /// to cascade file deletion so no edge references a removed node.
    pub fn prune_file(&mut self, path: &str) {
        self.targets
            .retain(|e| e.call.file != path && e.target.file != path);
        self.depends_on
            .retain(|e| e.source.file != path && e.target.file != path);
    }
}

/// Side-effect-free dump of one project, for visualization export.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub project: String,
    pub files: Vec<(String, FileRecord)>,
    pub edges: DerivedEdges,
}

/// Per-file ingestion outcome. Malformed entries are skipped and counted
/// here rather than failing the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub symbols: usize,
    pub call_sites: usize,
    pub imports: usize,
    pub skipped_definitions: usize,
    pub skipped_calls: usize,
}

impl IngestStats {
    pub fn absorb(&mut self, other: IngestStats) {
        self.symbols += other.symbols;
        self.call_sites += other.call_sites;
        self.imports += other.imports;
        self.skipped_definitions += other.skipped_definitions;
        self.skipped_calls += other.skipped_calls;
    }

    pub fn skipped(&self) -> usize {
        self.skipped_definitions + self.skipped_calls
    }
}

/// Dedupe definitions sharing a name within one report. Later entries win on
/// kind and line; metadata keys are unioned (merge semantics).
pub fn merge_symbols(symbols: Vec<SymbolRecord>) -> Vec<SymbolRecord> {
    use std::collections::btree_map::Entry;

    let mut order: Vec<String> = Vec::new();
    let mut merged: BTreeMap<String, SymbolRecord> = BTreeMap::new();

    for sym in symbols {
        match merged.entry(sym.name.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.kind = sym.kind;
                existing.line = sym.line;
                existing.metadata.extend(sym.metadata);
            }
            Entry::Vacant(entry) => {
                order.push(sym.name.clone());
                entry.insert(sym);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|name| merged.remove(&name))
        .collect()
}
