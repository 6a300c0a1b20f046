//! Targetron CLI - reshape wide contact CSV exports
//!
//! # Main Commands
//!
//! ```bash
//! targetron expand leads.csv -o contacts.csv   # One row per contact
//! targetron explode leads.csv                  # One row per comma-separated value
//! targetron serve                              # Start HTTP server (port 3000)
//! targetron layout list                        # Manage contact layouts
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! targetron parse leads.csv        # Parse CSV to JSON records
//! targetron layout example         # Print the default layout JSON
//! ```
//!
//! CSV output goes to stdout unless `--output` is given; progress goes to stderr.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use targetron::api::logs::{log_success, LOG_BROADCASTER};
use targetron::pipeline::format_delimiter;
use targetron::transform::columns::cell_text;
use targetron::{
    default_layout, numbered_layout, parse_csv_file, run_file, to_csv_string, LayoutRegistry, PipelineResult, Table,
    TransformKind, TransformOptions,
};

#[derive(Parser)]
#[command(name = "targetron")]
#[command(about = "Reshape wide contact CSV exports into one row per contact", long_about = None)]
struct Cli {
    /// Silence progress logs
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand contact groups: one output row per contact, deduplicated by email
    Expand {
        /// Input CSV file
        input: PathBuf,

        /// Registry layout id (auto-detected from headers if not specified)
        #[arg(short, long)]
        layout: Option<String>,

        /// Layout JSON file, takes precedence over --layout
        #[arg(long)]
        layout_file: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Explode delimited cells: one output row per piece
    Explode {
        /// Input CSV file
        input: PathBuf,

        /// Character cells are split on
        #[arg(short, long, default_value = ",")]
        split_on: char,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Parse a CSV file and output JSON records
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage contact layouts
    Layout {
        #[command(subcommand)]
        action: LayoutAction,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Input CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write to `<prefix>_exploded.csv` in the current directory
    #[arg(long, conflicts_with = "output")]
    prefix: Option<String>,

    /// Print the first N rows before and after
    #[arg(long, value_name = "N")]
    preview: Option<usize>,
}

impl CommonArgs {
    fn options(&self) -> TransformOptions {
        let mut options = TransformOptions {
            input_delimiter: self.delimiter,
            ..TransformOptions::default()
        };
        if let Some(ref prefix) = self.prefix {
            options.file_prefix = prefix.clone();
        }
        if let Some(n) = self.preview {
            options.preview_rows = n;
        }
        options
    }

    /// Explicit `--output`, else the prefixed file name when `--prefix` is set.
    fn destination(&self, result: &PipelineResult) -> Option<PathBuf> {
        self.output
            .clone()
            .or_else(|| self.prefix.as_ref().map(|_| PathBuf::from(&result.file_name)))
    }
}

#[derive(Subcommand)]
enum LayoutAction {
    /// List all layouts
    List,

    /// Show details of a layout
    Show {
        /// Layout ID
        id: String,
    },

    /// Import a layout JSON file
    Import {
        /// Layout JSON file to import
        file: PathBuf,
        /// Name for the layout
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Delete a stored layout
    Delete {
        /// Layout ID
        id: String,
    },

    /// Print a built-in layout as a starting point
    Example {
        /// Print the ` 1`/` 2`/` 3` numbered variant
        #[arg(long)]
        numbered: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOG_BROADCASTER.set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Expand {
            input,
            layout,
            layout_file,
            common,
        } => cmd_expand(&input, layout, layout_file.as_deref(), &common),

        Commands::Explode { input, split_on, common } => cmd_explode(&input, split_on, &common),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Layout { action } => cmd_layout(action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_expand(
    input: &Path,
    layout: Option<String>,
    layout_file: Option<&Path>,
    common: &CommonArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = TransformOptions {
        layout_id: layout,
        layout_path: layout_file.map(|p| p.to_string_lossy().to_string()),
        ..common.options()
    };

    let result = run_file(input, TransformKind::Expand, &options)?;
    finish(&result, common)
}

fn cmd_explode(input: &Path, split_on: char, common: &CommonArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = TransformOptions {
        split_on,
        ..common.options()
    };

    let result = run_file(input, TransformKind::Explode, &options)?;
    finish(&result, common)
}

/// Print previews, then write the output CSV.
fn finish(result: &PipelineResult, common: &CommonArgs) -> Result<(), Box<dyn std::error::Error>> {
    if common.preview.is_some() {
        print_preview("Before", &result.before, result.csv_info.row_count);
        print_preview("After", &result.after, result.output.len());
    }

    let csv = to_csv_string(&result.output)?;
    write_output(&csv, common.destination(result).as_deref())?;

    log_success(format!("✨ Done! {} → {} rows", result.stats.input_rows, result.stats.output_rows));
    Ok(())
}

/// Render the first rows of a table on stderr.
fn print_preview(label: &str, table: &Table, total: usize) {
    const MAX_WIDTH: usize = 24;
    let clip = |s: &str| -> String {
        if s.chars().count() > MAX_WIDTH {
            format!("{}…", s.chars().take(MAX_WIDTH - 1).collect::<String>())
        } else {
            s.to_string()
        }
    };

    eprintln!("\n📋 {} ({} of {} rows)", label, table.len(), total);
    let header: Vec<String> = table.columns().iter().map(|c| clip(c)).collect();
    eprintln!("   {}", header.join(" | "));
    for row in table.raw_rows() {
        let cells: Vec<String> = row.iter().map(|v| clip(&cell_text(v))).collect();
        eprintln!("   {}", cells.join(" | "));
    }
}

fn cmd_parse(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers().join(", "));
    if !result.skipped.is_empty() {
        eprintln!("   ⚠️  Skipped {} malformed rows", result.skipped.len());
    }
    eprintln!("✅ Parsed {} records", result.table.len());

    let json = serde_json::to_string_pretty(&result.table.to_records())?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    targetron::server::start_server(port).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}

fn cmd_layout(action: LayoutAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = LayoutRegistry::new();

    match action {
        LayoutAction::List => {
            let layouts = registry.list();
            eprintln!("📋 Layouts ({}) in {}:\n", layouts.len(), registry.dir().display());
            for l in layouts {
                let kind = if l.builtin { " [built-in]" } else { "" };
                println!("  📄 {} ({}){}", l.name, l.id, kind);
                if !l.layout.description.is_empty() {
                    println!("     {}", l.layout.description);
                }
                println!("     Groups: {}", l.layout.groups.len());
                println!("     Uses: {}", l.use_count);
                if let Some(ref last) = l.last_used {
                    println!("     Last used: {}", last);
                }
                println!();
            }
        }

        LayoutAction::Show { id } => {
            let l = registry.get(&id).ok_or_else(|| format!("Layout not found: {}", id))?;
            println!("📄 Layout: {} ({})\n", l.name, l.id);
            if !l.builtin {
                println!("Created: {}", l.created_at);
                println!("Uses: {}", l.use_count);
            }
            println!("Columns: {}", l.layout.referenced_columns().join(", "));
            println!("\nLayout:");
            println!("{}", l.layout.to_json()?);
        }

        LayoutAction::Import { file, name } => {
            eprintln!("📥 Importing layout from: {}", file.display());
            let id = registry.import(&file, name.as_deref())?;
            eprintln!("✅ Layout saved with ID: {}", id);
        }

        LayoutAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("🗑️  Layout deleted: {}", id);
        }

        LayoutAction::Example { numbered } => {
            let layout = if numbered { numbered_layout() } else { default_layout() };
            println!("{}", layout.to_json()?);
        }
    }

    Ok(())
}
