//! `sgc` — schema-to-graph compiler command-line interface.
//!
//! Works on schema files without a graph store:
//!
//! - **`estimate`** — print how many ids a schema will consume.
//! - **`plan`** — print the operation batch a conversion would apply, using
//!   consecutive ids in place of a store reservation.
//!
//! All subcommands read JSON from a file path or from stdin (`-`).

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use schemagraph::{estimate, plan, LinkId, SchemaNode, WellKnownIds};

/// sgc — schema-to-graph compiler
///
/// Estimate and preview the graph structure of JSON-Schema documents.
#[derive(Parser)]
#[command(name = "sgc", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the number of ids a conversion of the schema reserves.
    ///
    /// Pass `-` as FILE to read from stdin.
    Estimate {
        /// Path to a JSON-Schema file, or `-` for stdin.
        file: PathBuf,
    },

    /// Print the operation batch for a schema.
    ///
    /// Kinds are the bootstrap vocabulary (ids 1 to 7). Reserved ids are
    /// simulated as a consecutive run starting at `--first-id`.
    ///
    /// Examples:
    ///   sgc plan order.json --container 42
    ///   cat order.json | sgc plan - --container 42 --format json
    Plan {
        /// Path to a JSON-Schema file, or `-` for stdin.
        file: PathBuf,

        /// Node that contains everything the schema produces.
        #[arg(long, value_name = "ID")]
        container: LinkId,

        /// First simulated id.
        #[arg(long, value_name = "ID", default_value_t = 8)]
        first_id: LinkId,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Estimate { file } => {
            let schema = parse_schema(&read_input(&file));
            println!("{}", estimate(&schema));
        }

        Command::Plan {
            file,
            container,
            first_id,
            format,
        } => {
            let schema = parse_schema(&read_input(&file));
            let kinds = WellKnownIds::bootstrap();
            let compiled = plan(&schema, first_id, container, &kinds)
                .unwrap_or_else(|e| fatal(&format!("compilation failed: {e}")));

            match format {
                Format::Text => {
                    match compiled.root {
                        Some(root) => println!("root #{root}"),
                        None => println!("root: none (schema has no materialized shape)"),
                    }
                    print!(
                        "{}",
                        schemagraph::render::render_batch(&compiled.operations, &kinds)
                    );
                }
                Format::Json => {
                    let body = serde_json::json!({
                        "root": compiled.root,
                        "kinds": kinds,
                        "operations": compiled.operations,
                    });
                    match serde_json::to_string_pretty(&body) {
                        Ok(json) => println!("{json}"),
                        Err(e) => fatal(&format!("failed to serialize plan: {e}")),
                    }
                }
            }
        }
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &PathBuf) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path).unwrap_or_else(|e| {
            fatal(&format!("failed to read {}: {}", path.display(), e))
        })
    }
}

fn parse_schema(json: &str) -> SchemaNode {
    SchemaNode::from_json(json)
        .unwrap_or_else(|e| fatal(&format!("failed to parse input as JSON: {}", e)))
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("sgc: {}", msg);
    process::exit(2);
}
