/// End-to-end impact analysis scenarios:
/// ingest parser reports, link, and query blast radii through the
/// application layer exactly the way the CLI and server do.
use ripplemap::api::dto::{AnalysisReportDto, FileAnalysisDto};
use ripplemap::application::App;
use ripplemap::domain::store::MemoryGraphStore;
use ripplemap::infrastructure::config::Config;
use std::sync::Arc;

fn report(filename: &str, data: serde_json::Value) -> AnalysisReportDto {
    AnalysisReportDto {
        filename: filename.to_string(),
        data: serde_json::from_value::<FileAnalysisDto>(data).unwrap(),
    }
}

fn memory_app() -> App {
    App::new(Arc::new(MemoryGraphStore::new()), Config::default())
}

/// auth.py defines authenticate_user (line 2) calling validate_token;
/// api.py defines login_endpoint (line 5) calling authenticate_user.
fn auth_api_reports() -> Vec<AnalysisReportDto> {
    vec![
        report(
            "auth.py",
            serde_json::json!({
                "definitions": [{"type": "function", "name": "authenticate_user", "line": 2}],
                "calls": [{"name": "validate_token", "parent": "authenticate_user", "line": 3}],
                "imports": [{"content": "import jwt", "line": 1}]
            }),
        ),
        report(
            "api.py",
            serde_json::json!({
                "definitions": [{"type": "function", "name": "login_endpoint", "line": 5}],
                "calls": [{"name": "authenticate_user", "parent": "login_endpoint", "line": 6}]
            }),
        ),
    ]
}

#[test]
fn resolution_links_caller_across_files() {
    let app = memory_app();
    app.ingest_batch("demo", auth_api_reports()).unwrap();

    let impact = app.impact("demo", "auth.py", None).unwrap();
    assert_eq!(impact.changed_file, "auth.py");
    assert_eq!(impact.defined_symbols, vec!["authenticate_user".to_string()]);

    assert_eq!(impact.dependents.len(), 1);
    let dependent = &impact.dependents[0];
    assert_eq!(dependent.file, "api.py");
    assert_eq!(dependent.symbol, "login_endpoint");
    assert_eq!(dependent.line, 5);
    assert_eq!(dependent.depends_on, "authenticate_user");
}

#[test]
fn ingestion_order_does_not_matter() {
    // Two-phase linking: the caller's file can arrive first.
    let app = memory_app();
    let mut reports = auth_api_reports();
    reports.reverse();
    app.ingest_batch("demo", reports).unwrap();

    let impact = app.impact("demo", "auth.py", None).unwrap();
    assert_eq!(impact.dependents.len(), 1);
    assert_eq!(impact.dependents[0].symbol, "login_endpoint");
}

#[test]
fn rename_invalidates_stale_dependency() {
    let app = memory_app();
    app.ingest_batch("demo", auth_api_reports()).unwrap();
    assert_eq!(app.impact("demo", "auth.py", None).unwrap().dependents.len(), 1);

    // authenticate_user is renamed to authenticate; the old edge must die.
    app.ingest_batch(
        "demo",
        vec![report(
            "auth.py",
            serde_json::json!({
                "definitions": [{"type": "function", "name": "authenticate", "line": 2}],
                "calls": [{"name": "validate_token", "parent": "authenticate", "line": 3}]
            }),
        )],
    )
    .unwrap();

    let impact = app.impact("demo", "auth.py", None).unwrap();
    assert_eq!(impact.defined_symbols, vec!["authenticate".to_string()]);
    assert!(impact.dependents.is_empty());
}

#[test]
fn repeated_ingest_and_link_is_idempotent() {
    let app = memory_app();
    let first = app.ingest_batch("demo", auth_api_reports()).unwrap();
    let second = app.ingest_batch("demo", auth_api_reports()).unwrap();

    assert_eq!(first.ingest.symbols, second.ingest.symbols);
    assert_eq!(first.link.target_edges, second.link.target_edges);
    assert_eq!(first.link.depends_edges, second.link.depends_edges);

    let snapshot = app.export("demo").unwrap();
    assert_eq!(snapshot.files.len(), 2);
    assert_eq!(snapshot.edges.targets.len(), 1);
    assert_eq!(snapshot.edges.depends_on.len(), 1);
}

#[test]
fn mutual_recursion_terminates() {
    let app = memory_app();
    app.ingest_batch(
        "demo",
        vec![
            report(
                "a.py",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "ping", "line": 1}],
                    "calls": [{"name": "pong", "parent": "ping", "line": 2}]
                }),
            ),
            report(
                "b.py",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "pong", "line": 1}],
                    "calls": [{"name": "ping", "parent": "pong", "line": 2}]
                }),
            ),
        ],
    )
    .unwrap();

    // Deep transitive walk across the cycle must terminate and dedupe.
    let impact = app.impact("demo", "a.py", Some(64)).unwrap();
    assert_eq!(impact.dependents.len(), 1);
    assert_eq!(impact.dependents[0].symbol, "pong");
}

#[test]
fn cross_language_stitching_reaches_endpoint() {
    let app = memory_app();
    app.ingest_batch(
        "shop",
        vec![
            report(
                "server/orders.py",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "create_order", "line": 10}]
                }),
            ),
            report(
                "client/checkout.ts",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "submitCheckout", "line": 4}],
                    "calls": [{"name": "axios.post", "parent": "submitCheckout", "line": 7}]
                }),
            ),
        ],
    )
    .unwrap();

    // The client call cannot resolve by name; the stitcher links it to the
    // endpoint-shaped handler, so changing the server file impacts the
    // client symbol.
    let impact = app.impact("shop", "server/orders.py", None).unwrap();
    assert_eq!(impact.dependents.len(), 1);
    assert_eq!(impact.dependents[0].symbol, "submitCheckout");
    assert_eq!(impact.dependents[0].file, "client/checkout.ts");
}

#[test]
fn malformed_entries_are_isolated() {
    let app = memory_app();
    let summary = app
        .ingest_batch(
            "demo",
            vec![report(
                "mixed.py",
                serde_json::json!({
                    "definitions": [
                        {"type": "function", "name": "good", "line": 1},
                        {"type": "function", "line": 5},
                        {"name": "no_type", "line": 6}
                    ],
                    "calls": [
                        {"name": "good", "line": 9},
                        {"line": 10}
                    ]
                }),
            )],
        )
        .unwrap();

    assert_eq!(summary.ingest.symbols, 1);
    assert_eq!(summary.ingest.call_sites, 1);
    assert_eq!(summary.ingest.skipped_definitions, 2);
    assert_eq!(summary.ingest.skipped_calls, 1);

    // The good entries made it into the graph.
    let impact = app.impact("demo", "mixed.py", None).unwrap();
    assert_eq!(impact.defined_symbols, vec!["good".to_string()]);
}

#[test]
fn class_symbols_participate_in_impact() {
    let app = memory_app();
    app.ingest_batch(
        "demo",
        vec![
            report(
                "models.py",
                serde_json::json!({
                    "definitions": [{"type": "class", "name": "Session", "line": 3}]
                }),
            ),
            report(
                "handlers.py",
                serde_json::json!({
                    "definitions": [{"type": "function", "name": "open_session", "line": 8}],
                    "calls": [{"name": "Session", "parent": "open_session", "line": 9}]
                }),
            ),
        ],
    )
    .unwrap();

    let impact = app.impact("demo", "models.py", None).unwrap();
    assert_eq!(impact.dependents.len(), 1);
    assert_eq!(impact.dependents[0].symbol, "open_session");
    assert_eq!(impact.dependents[0].depends_on, "Session");
}
