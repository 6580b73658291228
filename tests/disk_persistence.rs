/// Disk-backend lifecycle: the graph must survive a store reopen, and the
/// reopened graph must answer the same impact queries.
use ripplemap::api::dto::{AnalysisReportDto, FileAnalysisDto};
use ripplemap::application::App;
use ripplemap::domain::store::DiskGraphStore;
use ripplemap::infrastructure::config::Config;
use std::sync::Arc;
use tempfile::tempdir;

fn report(filename: &str, data: serde_json::Value) -> AnalysisReportDto {
    AnalysisReportDto {
        filename: filename.to_string(),
        data: serde_json::from_value::<FileAnalysisDto>(data).unwrap(),
    }
}

fn disk_config() -> Config {
    // Store path is irrelevant here; the store is constructed directly.
    Config::default()
}

#[test]
fn graph_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("graph.db");

    {
        let store = Arc::new(DiskGraphStore::open(&db_path).unwrap());
        let app = App::new(store, disk_config());
        app.ingest_batch(
            "persisted",
            vec![
                report(
                    "auth.py",
                    serde_json::json!({
                        "definitions": [{"type": "function", "name": "authenticate_user", "line": 2}]
                    }),
                ),
                report(
                    "api.py",
                    serde_json::json!({
                        "definitions": [{"type": "function", "name": "login_endpoint", "line": 5}],
                        "calls": [{"name": "authenticate_user", "parent": "login_endpoint", "line": 6}]
                    }),
                ),
            ],
        )
        .unwrap();
    } // store dropped, flushed to disk

    let store = Arc::new(DiskGraphStore::open(&db_path).unwrap());
    let app = App::new(store, disk_config());

    assert_eq!(app.projects().unwrap(), vec!["persisted".to_string()]);
    let impact = app.impact("persisted", "auth.py", None).unwrap();
    assert_eq!(impact.dependents.len(), 1);
    assert_eq!(impact.dependents[0].symbol, "login_endpoint");
}

#[test]
fn disk_and_memory_backends_agree() {
    let dir = tempdir().unwrap();
    let disk = Arc::new(DiskGraphStore::open(&dir.path().join("g.db")).unwrap());
    let memory = Arc::new(ripplemap::domain::store::MemoryGraphStore::new());

    let reports = || {
        vec![
            report(
                "a.py",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "alpha", "line": 1}],
                    "calls": [{"name": "beta", "parent": "alpha", "line": 2}]
                }),
            ),
            report(
                "b.py",
                serde_json::json!({
                    "definitions": [{"type": "class", "name": "beta", "line": 1}]
                }),
            ),
        ]
    };

    let disk_app = App::new(disk, disk_config());
    let memory_app = App::new(memory, disk_config());

    disk_app.ingest_batch("parity", reports()).unwrap();
    memory_app.ingest_batch("parity", reports()).unwrap();

    let disk_impact = disk_app.impact("parity", "b.py", None).unwrap();
    let memory_impact = memory_app.impact("parity", "b.py", None).unwrap();
    assert_eq!(disk_impact, memory_impact);

    let disk_snapshot = disk_app.export("parity").unwrap();
    let memory_snapshot = memory_app.export("parity").unwrap();
    assert_eq!(disk_snapshot.files, memory_snapshot.files);
    assert_eq!(disk_snapshot.edges, memory_snapshot.edges);
}
