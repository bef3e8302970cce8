//! `schemagraph-convert` — run schema-to-graph conversions against a store.
//!
//! # Quick start
//!
//! ```sh
//! # Stage a schema in a persistent store, then convert it:
//! SCHEMAGRAPH_DB=./graph.db schemagraph-convert seed --schema order.json
//! SCHEMAGRAPH_DB=./graph.db schemagraph-convert run 11
//!
//! # Stage and convert in one go against a throwaway in-memory store:
//! schemagraph-convert convert --schema order.json
//! ```
//!
//! Results are printed to stdout as JSON: `{ "result": ..., "logs": [...] }`
//! on success, `{ "error": ..., "code": ..., "logs": [...] }` on failure (exit
//! status 1). Process logs go to stderr and are filtered by `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schemagraph::LinkId;
use schemagraph_converter::{
    stage_conversion, ConverterSettings, Converter, FailureReport, GraphStore,
};
use serde::Serialize;
use serde_json::Value;

/// schemagraph-convert — materialize JSON-Schema documents as graph structure
#[derive(Parser)]
#[command(name = "schemagraph-convert", version, about, long_about = None)]
struct Cli {
    /// SQLite database file. Omit for an in-memory store.
    #[arg(long, env = "SCHEMAGRAPH_DB", global = true)]
    db: Option<String>,

    /// Namespace of the kind vocabulary.
    #[arg(
        long,
        env = "SCHEMAGRAPH_NAMESPACE",
        default_value = schemagraph::CORE_NAMESPACE,
        global = true
    )]
    namespace: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert the schema attached to an existing trigger link.
    Run {
        /// Id of the link whose `from` end holds the configuration and whose
        /// `to` end holds the schema.
        trigger: LinkId,
    },

    /// Store a schema with its configuration and print the staged link ids.
    Seed {
        /// Path to a JSON-Schema file, or `-` for stdin.
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,

        /// Existing container node. A new one is created when omitted.
        #[arg(long, value_name = "ID")]
        container: Option<LinkId>,
    },

    /// Seed a schema and convert it immediately.
    Convert {
        /// Path to a JSON-Schema file, or `-` for stdin.
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,

        /// Existing container node. A new one is created when omitted.
        #[arg(long, value_name = "ID")]
        container: Option<LinkId>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schemagraph_converter=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConverterSettings {
        db_path: cli.db,
        namespace: cli.namespace,
    };
    let store = settings
        .open_store()
        .unwrap_or_else(|e| fatal(&e.to_string()));

    match cli.command {
        Command::Run { trigger } => run(store, &settings.namespace, trigger).await,

        Command::Seed { schema, container } => {
            let schema = read_schema(&schema);
            let staged = stage_conversion(store.as_ref(), &settings.namespace, &schema, container)
                .await
                .unwrap_or_else(|e| fatal(&format!("failed to stage schema: {e}")));
            print_json(&staged);
        }

        Command::Convert { schema, container } => {
            let schema = read_schema(&schema);
            let staged = stage_conversion(store.as_ref(), &settings.namespace, &schema, container)
                .await
                .unwrap_or_else(|e| fatal(&format!("failed to stage schema: {e}")));
            run(store, &settings.namespace, staged.trigger_link_id).await;
        }
    }
}

async fn run(store: Arc<dyn GraphStore>, namespace: &str, trigger: LinkId) {
    match Converter::with_namespace(store, namespace)
        .convert(trigger)
        .await
    {
        Ok(outcome) => print_json(&outcome),
        Err(failure) => {
            print_json(&FailureReport::from(&failure));
            process::exit(1);
        }
    }
}

/// Read and parse a JSON file, or stdin when the path is `"-"`.
fn read_schema(path: &Path) -> Value {
    let text = if path.to_str() == Some("-") {
        std::io::read_to_string(std::io::stdin())
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")))
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    };
    serde_json::from_str(&text)
        .unwrap_or_else(|e| fatal(&format!("{} is not valid JSON: {e}", path.display())))
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fatal(&format!("failed to serialize output: {e}")),
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("schemagraph-convert: {msg}");
    process::exit(2);
}
