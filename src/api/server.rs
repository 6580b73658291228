use crate::api::dto::{AnalysisReportDto, GraphDto};
use crate::application::App;
use crate::domain::errors::GraphError;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IngestParams {
    project: String,
    reports: Vec<AnalysisReportDto>,
}

#[derive(Debug, Deserialize)]
struct ImpactParams {
    project: String,
    path: String,
    #[serde(default)]
    depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project: String,
}

#[derive(Debug, Deserialize)]
struct FileParams {
    project: String,
    path: String,
}

/// Line-delimited JSON command server. One request per line, one response
/// per line, one thread per connection; the shared `App` serializes what
/// needs serializing.
pub fn start_server(port: u16, app: Arc<App>) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind to {}", address))?;

    tracing::info!(%address, "API server listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let app = Arc::clone(&app);
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, app) {
                        tracing::error!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => tracing::error!(error = %e, "accept error"),
        }
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream, app: Arc<App>) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break; // Connection closed
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(trimmed, &app) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => error_envelope(&e),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;

        if let Ok(req) = serde_json::from_str::<CommandReq>(trimmed) {
            if req.command == "SHUTDOWN" {
                tracing::info!("shutdown requested");
                std::process::exit(0);
            }
        }
    }
    Ok(())
}

/// Typed not-found surfaces as a structured error code so callers can
/// distinguish it from a plain failure.
fn error_envelope(error: &anyhow::Error) -> serde_json::Value {
    match error.downcast_ref::<GraphError>() {
        Some(GraphError::ProjectNotFound(_)) => json!({
            "status": "error",
            "code": "project_not_found",
            "message": error.to_string()
        }),
        _ => json!({
            "status": "error",
            "message": error.to_string()
        }),
    }
}

fn process_command(json_str: &str, app: &App) -> Result<serde_json::Value> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "INGEST" => handle_ingest(req.params, app),
        "IMPACT" => handle_impact(req.params, app),
        "EXPORT" => handle_export(req.params, app),
        "PROJECTS" => Ok(serde_json::to_value(app.projects()?)?),
        "DELETE_FILE" => handle_delete_file(req.params, app),
        "CLEAR_PROJECT" => handle_clear_project(req.params, app),
        // Destructive and irreversible; only this dedicated command
        // performs it, never a default.
        "CLEAR_ALL" => {
            app.clear_all()?;
            Ok(json!("cleared all projects"))
        }
        "SHUTDOWN" => Ok(json!("Shutting down...")),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T> {
    let params = params.ok_or_else(|| anyhow::anyhow!("Missing params"))?;
    serde_json::from_value(params).context("Invalid params")
}

fn handle_ingest(params: Option<serde_json::Value>, app: &App) -> Result<serde_json::Value> {
    let params: IngestParams = parse_params(params)?;
    tracing::info!(project = %params.project, files = params.reports.len(), "ingest requested");
    let summary = app.ingest_batch(&params.project, params.reports)?;
    Ok(serde_json::to_value(summary)?)
}

fn handle_impact(params: Option<serde_json::Value>, app: &App) -> Result<serde_json::Value> {
    let params: ImpactParams = parse_params(params)?;
    let report = app.impact(&params.project, &params.path, params.depth)?;
    Ok(serde_json::to_value(report)?)
}

fn handle_export(params: Option<serde_json::Value>, app: &App) -> Result<serde_json::Value> {
    let params: ProjectParams = parse_params(params)?;
    let snapshot = app.export(&params.project)?;
    Ok(serde_json::to_value(GraphDto::from(&snapshot))?)
}

fn handle_delete_file(params: Option<serde_json::Value>, app: &App) -> Result<serde_json::Value> {
    let params: FileParams = parse_params(params)?;
    let removed = app.delete_file(&params.project, &params.path)?;
    Ok(json!({ "removed": removed }))
}

fn handle_clear_project(params: Option<serde_json::Value>, app: &App) -> Result<serde_json::Value> {
    let params: ProjectParams = parse_params(params)?;
    let removed = app.clear_project(&params.project)?;
    Ok(json!({ "removed": removed }))
}
