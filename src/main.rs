// Command-line entry point for Ripplemap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ripplemap::api::server;
use ripplemap::application::App;
use ripplemap::domain::store::{DiskGraphStore, GraphStore, MemoryGraphStore};
use ripplemap::infrastructure::concurrency;
use ripplemap::infrastructure::config::{Config, StoreBackend};
use ripplemap::infrastructure::report_loader::ReportLoader;
use ripplemap::ports::graph_exporter::{DotGraphExporter, JsonGraphExporter};
use ripplemap::ports::SnapshotExporter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (defaults to ripplemap.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest parser reports into a project graph and re-link it
    Ingest {
        /// Project id scoping the ingested files
        #[arg(short, long)]
        project: String,

        /// Report file path (can specify multiple)
        #[arg(short, long)]
        report: Vec<PathBuf>,

        /// Folder(s) of report JSON files, scanned recursively
        #[arg(short = 'd', long)]
        dir: Vec<PathBuf>,
    },

    /// Answer "what breaks if this file changes?"
    Impact {
        #[arg(short, long)]
        project: String,

        /// Project-relative path of the changed file
        file: String,

        /// Override the configured traversal depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Export a project graph for visualization
    Export {
        #[arg(short, long)]
        project: String,

        /// Output file path
        #[arg(short, long)]
        output: String,

        /// Output format (json, dot)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// List known project ids
    Projects,

    /// Remove one file's subgraph from a project
    DeleteFile {
        #[arg(short, long)]
        project: String,

        file: String,
    },

    /// Clear one project's graph, or every project with --all --yes
    Clear {
        #[arg(short, long)]
        project: Option<String>,

        /// Clear every project
        #[arg(long)]
        all: bool,

        /// Confirmation required by --all; clearing everything is
        /// irreversible
        #[arg(long)]
        yes: bool,
    },

    /// Run the JSON-lines TCP API server
    Serve {
        #[arg(short = 'P', long)]
        port: Option<u16>,
    },
}

fn build_store(config: &Config) -> Result<Arc<dyn GraphStore>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryGraphStore::new())),
        StoreBackend::Disk => {
            let store = DiskGraphStore::open(&config.store.path).with_context(|| {
                format!("Failed to open graph store at {}", config.store.path.display())
            })?;
            Ok(Arc::new(store))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    concurrency::init_thread_pool()?;

    let store = build_store(&config)?;
    let app = App::new(store, config.clone());

    match cli.command {
        Command::Ingest {
            project,
            report,
            dir,
        } => {
            if report.is_empty() && dir.is_empty() {
                anyhow::bail!("Please provide at least one --report <file> or --dir <folder>");
            }

            let outcome = ReportLoader::load(&report, &dir)?;
            if !outcome.skipped.is_empty() {
                println!("Skipped {} unreadable report file(s)", outcome.skipped.len());
            }
            if outcome.reports.is_empty() {
                anyhow::bail!("No usable report files found");
            }

            let summary = app.ingest_batch(&project, outcome.reports)?;
            println!(
                "Ingested {} file(s): {} symbols, {} call sites, {} imports ({} malformed entries skipped)",
                summary.files,
                summary.ingest.symbols,
                summary.ingest.call_sites,
                summary.ingest.imports,
                summary.ingest.skipped()
            );
            println!(
                "Linked {} of {} call sites ({} stitched cross-language, {} dangling, {} ambiguous)",
                summary.link.resolved,
                summary.link.call_sites,
                summary.link.stitched,
                summary.link.dangling,
                summary.link.ambiguous
            );
        }

        Command::Impact {
            project,
            file,
            depth,
        } => {
            let report = app.impact(&project, &file, depth)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Export {
            project,
            output,
            format,
        } => {
            let snapshot = app.export(&project)?;
            match format.as_str() {
                "json" => JsonGraphExporter.export(&snapshot, &output)?,
                "dot" => DotGraphExporter.export(&snapshot, &output)?,
                other => anyhow::bail!("Unknown export format: {} (expected json or dot)", other),
            }
            println!("Export written to {} (format: {})", output, format);
        }

        Command::Projects => {
            let projects = app.projects()?;
            if projects.is_empty() {
                println!("No projects ingested yet");
            }
            for project in projects {
                println!("{project}");
            }
        }

        Command::DeleteFile { project, file } => {
            if app.delete_file(&project, &file)? {
                println!("Removed {} from project {}", file, project);
            } else {
                println!("File {} was not present in project {}", file, project);
            }
        }

        Command::Clear { project, all, yes } => {
            if all {
                if !yes {
                    anyhow::bail!(
                        "Refusing to clear all projects: pass --yes to confirm this irreversible operation"
                    );
                }
                app.clear_all()?;
                println!("Cleared all projects");
            } else if let Some(project) = project {
                if app.clear_project(&project)? {
                    println!("Cleared project {}", project);
                } else {
                    println!("Project {} was not present", project);
                }
            } else {
                anyhow::bail!("Specify --project <id> or --all --yes");
            }
        }

        Command::Serve { port } => {
            let port = port.unwrap_or(config.server_port);
            server::start_server(port, Arc::new(app))?;
        }
    }

    Ok(())
}
