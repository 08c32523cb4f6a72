#![forbid(unsafe_code)]

//! WBS outline CLI - parse outlines and export diagram state.
//!
//! # Commands
//!
//! - `parse`: Output the parsed tree as nested JSON (or a summary)
//! - `detect`: Show the detected input dialect and its evidence
//! - `outline`: Normalize input to indented outline text
//! - `rename`: Relabel one node and print the resulting outline
//! - `layout`: Lay out the diagram and print the export document

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use wbs_core::{LayoutMode, WbsTree, rename_node, to_outline};
use wbs_diagram::{DiagramEngine, EngineConfig};
use wbs_parser::{ParseOptions, ParseResult, detect_dialect, parse_summary_json, parse_with_options};

/// WBS outline CLI - parse outlines and export diagram state.
#[derive(Debug, Parser)]
#[command(
    name = "wbs",
    version,
    about = "WBS outline CLI - parse outlines and export diagram state",
    long_about = "Turns indented outlines or coded WBS tables into a tree and\n\
        exports an interactive diagram's initial state as JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse input and output the tree as JSON.
    Parse {
        /// Input file path, "-" for stdin, or inline outline text.
        #[arg(default_value = "-")]
        input: String,

        #[command(flatten)]
        parse: ParseArgs,

        /// Output a compact summary instead of the full tree
        #[arg(long)]
        summary: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Detect the input dialect.
    Detect {
        /// Input file path, "-" for stdin, or inline outline text.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the normalized outline text.
    Outline {
        /// Input file path, "-" for stdin, or inline outline text.
        #[arg(default_value = "-")]
        input: String,

        #[command(flatten)]
        parse: ParseArgs,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Rename one node and print the resulting outline.
    Rename {
        /// Node id, e.g. "1.2"
        id: String,

        /// New label
        label: String,

        /// Input file path, "-" for stdin, or inline outline text.
        #[arg(default_value = "-")]
        input: String,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Lay out the diagram and output its export document as JSON.
    Layout {
        /// Input file path, "-" for stdin, or inline outline text.
        #[arg(default_value = "-")]
        input: String,

        #[command(flatten)]
        parse: ParseArgs,

        /// Layout mode (vertical, horizontal, radial)
        #[arg(short, long, default_value = "vertical")]
        mode: String,

        /// Document title
        #[arg(short, long, default_value = "Work Breakdown Structure")]
        title: String,

        /// Engine configuration file (TOML)
        #[arg(short, long)]
        config: Option<String>,

        /// Size every node to its label before exporting
        #[arg(long)]
        auto_fit: bool,

        /// Collapse these node ids before exporting (repeatable)
        #[arg(long = "collapse", value_name = "ID")]
        collapse: Vec<String>,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::Args)]
struct ParseArgs {
    /// Promote the first line of a flat outline to the root
    #[arg(long)]
    make_root: bool,

    /// Spaces per tab when measuring indentation
    #[arg(long, default_value_t = 2)]
    tab_width: usize,
}

impl From<ParseArgs> for ParseOptions {
    fn from(args: ParseArgs) -> Self {
        Self {
            make_first_line_root: args.make_root,
            tab_width: args.tab_width,
        }
    }
}

/// Result of detecting the input dialect.
#[derive(Debug, Serialize)]
struct DetectResult {
    dialect: String,
    coded_lines: usize,
    total_lines: usize,
    first_line: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Parse {
            input,
            parse,
            summary,
            pretty,
        } => cmd_parse(&input, parse.into(), summary, pretty),

        Command::Detect { input, json } => cmd_detect(&input, json),

        Command::Outline {
            input,
            parse,
            output,
        } => cmd_outline(&input, parse.into(), output.as_deref()),

        Command::Rename {
            id,
            label,
            input,
            parse,
        } => cmd_rename(&input, parse.into(), &id, &label),

        Command::Layout {
            input,
            parse,
            mode,
            title,
            config,
            auto_fit,
            collapse,
            output,
            pretty,
        } => cmd_layout(
            &input,
            parse.into(),
            &LayoutRequest {
                mode: &mode,
                title: &title,
                config: config.as_deref(),
                auto_fit,
                collapse: &collapse,
            },
            output.as_deref(),
            pretty,
        ),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline outline text
        Ok(input.to_string())
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text =
        std::fs::read_to_string(path).context(format!("Failed to read config file: {path}"))?;
    let config: EngineConfig =
        toml::from_str(&text).context(format!("Invalid config file: {path}"))?;
    config
        .validate()
        .context(format!("Invalid config file: {path}"))?;
    debug!(path, "loaded engine config");
    Ok(config)
}

/// Parse and surface every parser warning through the log.
fn parse_source(input: &str, options: ParseOptions) -> Result<ParseResult> {
    let source = load_input(input)?;
    let start = Instant::now();
    let parsed = parse_with_options(&source, options);
    info!(
        dialect = parsed.dialect.as_str(),
        nodes = parsed.tree.item_count(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "parsed input"
    );
    for warning in &parsed.warnings {
        warn!("{warning}");
    }
    Ok(parsed)
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize JSON")
}

fn cmd_parse(input: &str, options: ParseOptions, summary: bool, pretty: bool) -> Result<()> {
    let parsed = parse_source(input, options)?;
    let json = if summary {
        let value: serde_json::Value = serde_json::from_str(&parse_summary_json(&parsed))
            .context("Failed to read parse summary")?;
        to_json(&value, pretty)?
    } else {
        to_json(&parsed.tree.to_nested(), pretty)?
    };
    write_output(None, &json)
}

fn cmd_detect(input: &str, json_output: bool) -> Result<()> {
    let source = load_input(input)?;
    let detected = detect_dialect(&source);
    let result = DetectResult {
        dialect: detected.dialect.as_str().to_string(),
        coded_lines: detected.coded_lines,
        total_lines: detected.total_lines,
        first_line: source
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .trim()
            .to_string(),
    };

    if json_output {
        write_output(None, &to_json(&result, true)?)
    } else {
        write_output(
            None,
            &format!(
                "Dialect: {}\nCoded lines: {}/{}\nFirst line: {}",
                result.dialect, result.coded_lines, result.total_lines, result.first_line
            ),
        )
    }
}

fn cmd_outline(input: &str, options: ParseOptions, output: Option<&str>) -> Result<()> {
    let parsed = parse_source(input, options)?;
    write_output(output, &to_outline(&parsed.tree))
}

fn cmd_rename(input: &str, options: ParseOptions, id: &str, label: &str) -> Result<()> {
    let label = label.trim();
    if label.is_empty() {
        bail!("New label must not be blank");
    }
    let parsed = parse_source(input, options)?;
    let renamed = renamed_tree(&parsed.tree, id, label)?;
    write_output(None, &to_outline(&renamed))
}

fn renamed_tree(tree: &WbsTree, id: &str, label: &str) -> Result<WbsTree> {
    if tree.find(id).is_none() {
        bail!("Unknown node id: {id}");
    }
    Ok(rename_node(tree, id, label))
}

struct LayoutRequest<'a> {
    mode: &'a str,
    title: &'a str,
    config: Option<&'a str>,
    auto_fit: bool,
    collapse: &'a [String],
}

fn cmd_layout(
    input: &str,
    options: ParseOptions,
    request: &LayoutRequest<'_>,
    output: Option<&str>,
    pretty: bool,
) -> Result<()> {
    let mode: LayoutMode = request
        .mode
        .parse()
        .context(format!("Invalid layout mode: {}", request.mode))?;
    let config = load_config(request.config)?;
    let parsed = parse_source(input, options)?;

    let start = Instant::now();
    let mut engine = DiagramEngine::new(parsed.tree, config)
        .context("Failed to build diagram")?
        .with_layout_mode(mode);
    if request.auto_fit {
        engine.auto_fit_all();
    }
    for id in request.collapse {
        if !engine.collapse(id) {
            warn!("Cannot collapse {id}: unknown id or no children");
        }
    }
    info!(
        mode = mode.as_str(),
        nodes = engine.elements().node_count(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "laid out diagram"
    );

    let document = engine.export_document(request.title);
    let json = if pretty {
        document.to_json_pretty()
    } else {
        document.to_json()
    }
    .context("Failed to serialize export document")?;
    write_output(output, &json)
}
