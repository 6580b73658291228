use crate::domain::model::GraphSnapshot;

pub mod graph_exporter;

/// Output seam: renders a project snapshot to a file in some format.
pub trait SnapshotExporter {
    fn export(&self, snapshot: &GraphSnapshot, path: &str) -> std::io::Result<()>;
}
