//! Graph Exporters
//!
//! Renders a project snapshot for visualization: nodes/edges JSON for web
//! frontends, or Graphviz DOT with per-kind styling.

use crate::api::dto::{call_node_id, file_node_id, symbol_node_id, GraphDto};
use crate::domain::model::{EdgeProvenance, GraphSnapshot, SymbolKind};
use crate::ports::SnapshotExporter;
use std::io::Result;

pub struct JsonGraphExporter;

impl JsonGraphExporter {
    /// Convert a snapshot to the nodes/edges JSON consumed by the
    /// visualization frontend.
    pub fn to_json(snapshot: &GraphSnapshot) -> String {
        let dto = GraphDto::from(snapshot);
        serde_json::to_string_pretty(&dto).unwrap_or_else(|_| "{}".to_string())
    }
}

impl SnapshotExporter for JsonGraphExporter {
    fn export(&self, snapshot: &GraphSnapshot, path: &str) -> Result<()> {
        std::fs::write(path, Self::to_json(snapshot))
    }
}

pub struct DotGraphExporter;

impl DotGraphExporter {
    /// Convert a snapshot to DOT with per-kind node styling.
    pub fn to_dot(snapshot: &GraphSnapshot) -> String {
        let mut lines = Vec::new();

        lines.push("digraph Ripplemap {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=10];".to_string());
        lines.push("".to_string());

        for (path, record) in &snapshot.files {
            let (shape, color, style) = Self::file_style();
            lines.push(format!(
                "    \"{}\" [label=\"{}\", shape={}, style=\"{}\", fillcolor=\"{}\"];",
                file_node_id(path),
                Self::escape_label(path),
                shape,
                style,
                color
            ));

            for sym in &record.symbols {
                let (shape, color, style) = Self::symbol_style(sym.kind);
                lines.push(format!(
                    "    \"{}\" [label=\"{}\", shape={}, style=\"{}\", fillcolor=\"{}\"];",
                    symbol_node_id(path, &sym.name),
                    Self::escape_label(&sym.name),
                    shape,
                    style,
                    color
                ));
                lines.push(format!(
                    "    \"{}\" -> \"{}\" [label=\"contains\", color=\"#9399b2\"];",
                    file_node_id(path),
                    symbol_node_id(path, &sym.name)
                ));
            }

            for call in &record.call_sites {
                let (shape, color, style) = Self::call_style();
                lines.push(format!(
                    "    \"{}\" [label=\"{}\", shape={}, style=\"{}\", fillcolor=\"{}\"];",
                    call_node_id(path, call.line, &call.callee),
                    Self::escape_label(&call.callee),
                    shape,
                    style,
                    color
                ));
            }
        }

        lines.push("".to_string());

        for edge in &snapshot.edges.targets {
            let (label, color) = match edge.provenance {
                EdgeProvenance::Call => ("targets", "#1e66f5"),
                EdgeProvenance::Endpoint => ("calls_endpoint", "#df8e1d"),
            };
            lines.push(format!(
                "    \"{}\" -> \"{}\" [label=\"{}\", color=\"{}\"];",
                call_node_id(&edge.call.file, edge.call.line, &edge.call.callee),
                symbol_node_id(&edge.target.file, &edge.target.name),
                label,
                color
            ));
        }

        for edge in &snapshot.edges.depends_on {
            lines.push(format!(
                "    \"{}\" -> \"{}\" [label=\"depends_on\", color=\"#d20f39\", penwidth=2];",
                symbol_node_id(&edge.source.file, &edge.source.name),
                symbol_node_id(&edge.target.file, &edge.target.name)
            ));
        }

        lines.push("}".to_string());

        lines.join("\n")
    }

    fn file_style() -> (&'static str, &'static str, &'static str) {
        ("folder", "#cdd6f4", "filled")
    }

    fn symbol_style(kind: SymbolKind) -> (&'static str, &'static str, &'static str) {
        match kind {
            SymbolKind::Function => ("box", "#89b4fa", "filled"),
            SymbolKind::Class => ("box", "#cba6f7", "filled,rounded"),
        }
    }

    fn call_style() -> (&'static str, &'static str, &'static str) {
        ("ellipse", "#6c7086", "filled,dashed")
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

impl SnapshotExporter for DotGraphExporter {
    fn export(&self, snapshot: &GraphSnapshot, path: &str) -> Result<()> {
        std::fs::write(path, Self::to_dot(snapshot))
    }
}
