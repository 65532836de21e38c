//! Dataflow Layout CLI
//!
//! Usage:
//!   dataflow-layout [OPTIONS] [FILE]
//!
//! Options:
//!   -f, --format <FORMAT>  Output format: svg or json [default: svg]
//!   -d, --debug            Log reconciliation and solver activity to stderr
//!   --compact              Emit SVG without indentation
//!   -h, --help             Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use dataflow_layout::{layout_document, render_svg, SvgConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Svg,
    Json,
}

#[derive(Parser)]
#[command(name = "dataflow-layout")]
#[command(about = "Constraint-based layout for dataflow diagrams")]
struct Cli {
    /// Diagram document in TOML (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Svg)]
    format: Format,

    /// Debug mode: log reconciliation and solver activity
    #[arg(short, long)]
    debug: bool,

    /// Emit SVG on a single line
    #[arg(long)]
    compact: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let layout = match layout_document(&source) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("{}", e.format(&source, &filename).trim_end());
            std::process::exit(1);
        }
    };

    match cli.format {
        Format::Svg => {
            let config = SvgConfig::new().with_pretty_print(!cli.compact);
            println!("{}", render_svg(&layout.snapshot, &layout.solved, &config));
        }
        Format::Json => match serde_json::to_string_pretty(&layout) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn print_intro() {
    println!(
        r#"Dataflow Layout - constraint-based layout for dataflow diagrams

USAGE:
    dataflow-layout [OPTIONS] [FILE]
    cat diagram.toml | dataflow-layout

OPTIONS:
    -f, --format   svg (default) or json
    -d, --debug    Log reconciliation and solver activity
    --compact      Emit SVG on a single line
    -h, --help     Print help

DOCUMENT:
    [layout]                 spread, stack_spread, terminal_height, width, height
    [[element]]              id, type = "Node" | "Group" | "Link", parent,
                             width, height, inlets, outlets, constraints
    [[signal]]               id, writers, readers

Every signal wires one writer terminal to any number of reader terminals.
Readers are placed in columns to the right of their writers."#
    );
}
