use crate::domain::model::{
    CallSiteRecord, EdgeProvenance, GraphSnapshot, IngestStats, MetaValue, SymbolKind,
    SymbolRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parser report as delivered by a language worker: the analyzed file's
/// canonical path plus its raw parse output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReportDto {
    pub filename: String,
    pub data: FileAnalysisDto,
}

/// Raw per-file parse output. Every list is optional and every entry is
/// lenient; validation happens in `into_records` so one malformed entry
/// never sinks the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileAnalysisDto {
    #[serde(default)]
    pub definitions: Vec<RawDefinition>,
    #[serde(default)]
    pub calls: Vec<RawCall>,
    #[serde(default)]
    pub imports: Vec<RawImport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDefinition {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub line: Option<u32>,
    /// Any extra parser fields (parameters, docstring, decorators, ...).
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCall {
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    pub line: Option<u32>,
}

/// Imports are informational only; they are counted but never become graph
/// entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawImport {
    pub content: Option<String>,
    pub line: Option<u32>,
}

impl FileAnalysisDto {
    /// Validate raw entries into domain records. Entries missing a usable
    /// name, line, or kind are skipped and counted, not fatal.
    pub fn into_records(self) -> (Vec<SymbolRecord>, Vec<CallSiteRecord>, IngestStats) {
        let mut stats = IngestStats {
            imports: self.imports.len(),
            ..IngestStats::default()
        };

        let mut symbols = Vec::with_capacity(self.definitions.len());
        for def in self.definitions {
            let kind = def.kind.as_deref().and_then(SymbolKind::parse);
            match (kind, def.name, def.line) {
                (Some(kind), Some(name), Some(line)) if !name.is_empty() => {
                    symbols.push(SymbolRecord {
                        name,
                        kind,
                        line,
                        metadata: def
                            .metadata
                            .iter()
                            .map(|(k, v)| (k.clone(), MetaValue::from_json(v)))
                            .collect(),
                    });
                }
                _ => {
                    stats.skipped_definitions += 1;
                    tracing::warn!("skipping malformed definition entry");
                }
            }
        }
        stats.symbols = symbols.len();

        let mut call_sites = Vec::with_capacity(self.calls.len());
        for call in self.calls {
            match (call.name, call.line) {
                (Some(name), Some(line)) if !name.is_empty() => {
                    call_sites.push(CallSiteRecord {
                        callee: name,
                        line,
                        enclosing: call.parent.filter(|p| !p.is_empty()),
                    });
                }
                _ => {
                    stats.skipped_calls += 1;
                    tracing::warn!("skipping malformed call entry");
                }
            }
        }
        stats.call_sites = call_sites.len();

        (symbols, call_sites, stats)
    }
}

// ============================================================================
// Visualization export DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDto {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDto {
    pub from: String,
    pub to: String,
    pub label: String,
}

pub fn file_node_id(path: &str) -> String {
    format!("file:{path}")
}

pub fn symbol_node_id(file: &str, name: &str) -> String {
    format!("sym:{file}::{name}")
}

pub fn call_node_id(file: &str, line: u32, callee: &str) -> String {
    format!("call:{file}:{line}:{callee}")
}

impl From<&GraphSnapshot> for GraphDto {
    fn from(snapshot: &GraphSnapshot) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for (path, record) in &snapshot.files {
            nodes.push(NodeDto {
                id: file_node_id(path),
                label: format!("File: {path}"),
            });

            for sym in &record.symbols {
                let kind_label = match sym.kind {
                    SymbolKind::Function => "Function",
                    SymbolKind::Class => "Class",
                };
                nodes.push(NodeDto {
                    id: symbol_node_id(path, &sym.name),
                    label: format!("{kind_label}: {}", sym.name),
                });
                edges.push(EdgeDto {
                    from: file_node_id(path),
                    to: symbol_node_id(path, &sym.name),
                    label: "CONTAINS".to_string(),
                });
            }

            for call in &record.call_sites {
                nodes.push(NodeDto {
                    id: call_node_id(path, call.line, &call.callee),
                    label: format!("Call: {}", call.callee),
                });
                edges.push(EdgeDto {
                    from: file_node_id(path),
                    to: call_node_id(path, call.line, &call.callee),
                    label: "PERFORMS_CALL".to_string(),
                });
            }
        }

        for edge in &snapshot.edges.targets {
            let label = match edge.provenance {
                EdgeProvenance::Call => "TARGETS",
                EdgeProvenance::Endpoint => "CALLS_ENDPOINT",
            };
            edges.push(EdgeDto {
                from: call_node_id(&edge.call.file, edge.call.line, &edge.call.callee),
                to: symbol_node_id(&edge.target.file, &edge.target.name),
                label: label.to_string(),
            });
        }

        for edge in &snapshot.edges.depends_on {
            edges.push(EdgeDto {
                from: symbol_node_id(&edge.source.file, &edge.source.name),
                to: symbol_node_id(&edge.target.file, &edge.target.name),
                label: "DEPENDS_ON_SYMBOL".to_string(),
            });
        }

        GraphDto { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DerivedEdges, FileRecord};

    #[test]
    fn test_lenient_parse_skips_malformed_entries() {
        let raw = serde_json::json!({
            "definitions": [
                {"type": "function", "name": "good", "line": 3, "docstring": "ok"},
                {"type": "function", "line": 9},
                {"type": "widget", "name": "odd_kind", "line": 2},
                {"type": "class", "name": "Shape", "line": 12}
            ],
            "calls": [
                {"name": "good", "parent": null, "line": 20},
                {"name": "", "line": 21},
                {"line": 22}
            ],
            "imports": [
                {"content": "import os", "line": 1}
            ]
        });

        let dto: FileAnalysisDto = serde_json::from_value(raw).unwrap();
        let (symbols, calls, stats) = dto.into_records();

        assert_eq!(symbols.len(), 2);
        assert_eq!(calls.len(), 1);
        assert_eq!(stats.skipped_definitions, 2);
        assert_eq!(stats.skipped_calls, 2);
        assert_eq!(stats.imports, 1);
        assert!(symbols[0].metadata.contains_key("docstring"));
        assert_eq!(calls[0].enclosing, None);
    }

    #[test]
    fn test_graph_dto_includes_ownership_edges() {
        let dto: FileAnalysisDto = serde_json::from_value(serde_json::json!({
            "definitions": [{"type": "function", "name": "f", "line": 1}],
            "calls": [{"name": "g", "parent": "f", "line": 2}]
        }))
        .unwrap();
        let (symbols, calls, _) = dto.into_records();

        let snapshot = GraphSnapshot {
            project: "p1".to_string(),
            files: vec![(
                "a.py".to_string(),
                FileRecord {
                    symbols,
                    call_sites: calls,
                },
            )],
            edges: DerivedEdges::default(),
        };

        let graph = GraphDto::from(&snapshot);
        assert_eq!(graph.nodes.len(), 3); // file + symbol + call
        let labels: Vec<&str> = graph.edges.iter().map(|e| e.label.as_str()).collect();
        assert!(labels.contains(&"CONTAINS"));
        assert!(labels.contains(&"PERFORMS_CALL"));
    }
}
