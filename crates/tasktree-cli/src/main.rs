//! Task tree CLI.
//!
//! Provides the `tasktree` binary:
//! - `demo` runs the pick-and-place plan against an in-process world,
//!   prints the recorded tree as JSON and optionally persists and streams it.
//! - `show` prints the task trees persisted in a database.
//!
//! Reads configuration from environment variables, overridable by flags:
//! - `TASKTREE_DB_PATH`: SQLite database file path
//! - `TASKTREE_TELEMETRY_URL`: base URL of the node log service
//! - `TASKTREE_TELEMETRY_TIMEOUT_MS`: request timeout (default: 5000)
//!
//! Exit codes: 0 = success, 1 = plan failure, 3 = storage or I/O error.

mod plans;

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use tasktree_core::{LogExporter, NodeId, TaskError, TaskTree};
use tasktree_sim::{LogVisualizer, SimulatedTaskTree};
use tasktree_storage::{
    persist, PersistOptions, PersistProgress, PersistedId, ProcessMetadata, SqliteStore,
    StorageError, TaskStore,
};
use tasktree_telemetry::{HttpExporter, TelemetryConfig};

/// Record, simulate and persist plan execution traces.
#[derive(Parser)]
#[command(name = "tasktree", about = "Record, simulate and persist plan execution traces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pick-and-place demo plan and print its task tree.
    Demo {
        /// Persist the recorded tree to this database. With `--simulate`
        /// the simulated subtree is persisted before it is discarded.
        #[arg(short, long, env = "TASKTREE_DB_PATH")]
        db: Option<String>,

        /// Stream node documents to this log service.
        #[arg(long, env = "TASKTREE_TELEMETRY_URL")]
        telemetry_url: Option<String>,

        /// Run the plan inside a simulation scope; the world is restored and
        /// the recorded nodes are discarded afterwards.
        #[arg(long)]
        simulate: bool,

        /// Place the object out of reach so the plan fails.
        #[arg(long)]
        fail: bool,
    },
    /// Print the task trees stored in a database.
    Show {
        /// Path to the database file.
        #[arg(short, long, env = "TASKTREE_DB_PATH", default_value = "tasktree.db")]
        db: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Demo {
            db,
            telemetry_url,
            simulate,
            fail,
        } => run_demo(db.as_deref(), telemetry_url, simulate, fail).await,
        Commands::Show { db } => run_show(&db),
    };
    process::exit(exit_code);
}

/// Execute the demo subcommand. Returns the process exit code.
async fn run_demo(
    db_path: Option<&str>,
    telemetry_url: Option<String>,
    simulate: bool,
    fail: bool,
) -> i32 {
    let mut tree = TaskTree::new();

    let http = match telemetry_url {
        Some(base_url) => {
            let config = TelemetryConfig {
                base_url,
                ..TelemetryConfig::from_env()
            };
            match HttpExporter::new(&config, Handle::current()) {
                Ok(exporter) => {
                    tracing::info!(endpoint = exporter.endpoint(), "streaming task tree nodes");
                    let exporter = Arc::new(exporter);
                    tree.set_exporter(Some(exporter.clone()));
                    Some(exporter)
                }
                Err(e) => {
                    eprintln!("Error: failed to set up telemetry: {}", e);
                    return 3;
                }
            }
        }
        None => {
            tree.set_exporter(Some(Arc::new(LogExporter)));
            None
        }
    };

    let mut world = plans::kitchen();
    let plan = plans::pick_and_place(&world);
    let arguments = plans::demo_arguments(fail);

    let (outcome, reported) = if simulate {
        let mut viewer = LogVisualizer;
        let mut scope = SimulatedTaskTree::enter(&mut tree, &mut world, &mut viewer);
        let outcome = plan.call(&mut scope, arguments);
        let root = scope.simulated_root();
        let reported = report(&scope, root, db_path);
        (outcome, reported)
    } else {
        let outcome = plan.call(&mut tree, arguments);
        let reported = report(&tree, tree.root(), db_path);
        (outcome, reported)
    };

    if let Some(exporter) = http {
        exporter.flush().await;
    }

    if let Err(e) = reported {
        eprintln!("Error: {}", e);
        return 3;
    }
    match outcome {
        Ok(()) => 0,
        Err(TaskError::Plan(failure)) => {
            eprintln!("Plan failed ({}): {}", failure.kind.name(), failure);
            1
        }
        Err(e) => {
            eprintln!("Error: plan aborted: {}", e);
            1
        }
    }
}

/// Prints the tree under `root` as JSON and persists it when a database
/// path is given.
fn report(tree: &TaskTree, root: NodeId, db_path: Option<&str>) -> Result<(), StorageError> {
    tracing::debug!("recorded task tree:\n{}", tree);
    if let Some(document) = tree.serialize_tree(root) {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }

    let Some(path) = db_path else {
        return Ok(());
    };
    let mut store = SqliteStore::new(path)?;
    let options = PersistOptions {
        metadata: ProcessMetadata::current("tasktree demo"),
        ..PersistOptions::default()
    };
    let mut log_progress = |p: PersistProgress| {
        tracing::info!(done = p.done, total = p.total, "persisting task tree");
    };
    let id = persist(tree, root, &mut store, &options, Some(&mut log_progress))?;
    tracing::info!(root = %id, db = path, "task tree saved");
    Ok(())
}

/// Execute the show subcommand. Returns the process exit code.
fn run_show(db_path: &str) -> i32 {
    let store = match SqliteStore::new(db_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };

    match print_children(&store, None, 0) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: failed to read task trees: {}", e);
            3
        }
    }
}

fn print_children(
    store: &dyn TaskStore,
    parent: Option<PersistedId>,
    depth: usize,
) -> Result<(), StorageError> {
    for node in store.children_of(parent)? {
        let code = store.get_code(node.code_id)?;
        let mut line = format!("{}{} [{}]", "  ".repeat(depth), code.function, node.status);
        if let Some(designator) = code.designator_id {
            line.push_str(&format!(" {}", store.get_designator(designator)?.designator_type));
        }
        if let Some(reason) = &node.reason {
            line.push_str(&format!(" ({reason})"));
        }
        println!("{line}");
        print_children(store, Some(node.id), depth + 1)?;
    }
    Ok(())
}
