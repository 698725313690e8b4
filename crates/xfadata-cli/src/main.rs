use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use xfadata::envelope::{unwrap_envelope, DATASETS_ELEMENT};
use xfadata::{
    check_subset, document_to_xml, infer_schema, json_to_tree_with_config, schema_from_json,
    tree_to_json, unwrap_datasets, wrap_as_datasets, wrap_envelope, xml_to_tree_with_config,
    Config, SchemaNode, TreeNode,
};

#[derive(Debug, Parser)]
#[command(
    name = "xfadata",
    version,
    about = "Extract, describe and refill XFA form data"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Maximum element/object nesting depth (0 = unlimited)
    #[arg(long, global = true, default_value_t = Config::default().max_depth)]
    max_depth: u16,
    /// Maximum input size in bytes (0 = unlimited)
    #[arg(long, global = true, default_value_t = Config::default().max_size)]
    max_size: usize,
    /// Log debug details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert datasets XML to JSON (or normalized XML)
    Extract {
        #[command(flatten)]
        io: Io,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
        /// Emit the fill envelope {"data": {...}} instead of the whole document
        #[arg(long)]
        envelope: bool,
    },
    /// Infer the JSON schema of datasets XML
    Schema {
        #[command(flatten)]
        io: Io,
        /// Describe the fill envelope instead of the whole document
        #[arg(long)]
        envelope: bool,
    },
    /// Convert a JSON fill envelope to datasets XML
    Fill {
        #[command(flatten)]
        io: Io,
    },
    /// Check that a JSON fill envelope only uses fields the form declares
    Check {
        #[command(flatten)]
        io: Io,
        /// Datasets XML of the form to check against
        #[arg(long, value_name = "XML", conflicts_with = "schema", required_unless_present = "schema")]
        form: Option<PathBuf>,
        /// Envelope schema JSON (as printed by `schema --envelope`)
        #[arg(long, value_name = "JSON")]
        schema: Option<PathBuf>,
    },
}

#[derive(Debug, ClapArgs)]
struct Io {
    /// Input file (defaults to stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,
    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Xml,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::new(args.max_depth, args.max_size);
    debug!(?config, "parser limits");

    match args.command {
        Command::Extract {
            io,
            format,
            envelope,
        } => {
            let input = read_input(&io.input)?;
            let output = extract(&input, format, envelope, config)?;
            write_output(&io.output, &output)
        }
        Command::Schema { io, envelope } => {
            let input = read_input(&io.input)?;
            let document = parse_xml(&input, config)?;
            let schema = if envelope {
                infer_schema(&wrap_envelope(unwrap_datasets(document)?))
            } else {
                infer_schema(&document)
            };
            write_output(&io.output, &schema.to_json())
        }
        Command::Fill { io } => {
            let input = read_input(&io.input)?;
            let data = unwrap_envelope(parse_json(&input, config)?)?;
            info!(nodes = data.node_count(), "filling datasets");
            let xml = document_to_xml(&wrap_as_datasets(data), true)?;
            write_output(&io.output, &xml)
        }
        Command::Check { io, form, schema } => {
            let input = read_input(&io.input)?;
            let submission = parse_json(&input, config)?;
            // validates the envelope contract before the field check
            unwrap_envelope(submission.clone())?;

            let schema = load_schema(form, schema, config)?;
            check_subset(&submission, &schema).context("submission does not match the form")?;
            write_output(&io.output, "ok\n")
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn extract(input: &str, format: FormatArg, envelope: bool, config: Config) -> Result<String> {
    let document = parse_xml(input, config)?;
    match (format, envelope) {
        (FormatArg::Json, false) => Ok(tree_to_json(&document)),
        (FormatArg::Json, true) => Ok(tree_to_json(&wrap_envelope(unwrap_datasets(document)?))),
        (FormatArg::Xml, false) => {
            let namespaced = document.get(DATASETS_ELEMENT).is_some();
            Ok(document_to_xml(&document, namespaced)?)
        }
        (FormatArg::Xml, true) => bail!("--envelope is only available with --format json"),
    }
}

fn load_schema(form: Option<PathBuf>, schema: Option<PathBuf>, config: Config) -> Result<SchemaNode> {
    match (form, schema) {
        (Some(form), _) => {
            let xml = read_file(&form)?;
            let data = unwrap_datasets(parse_xml(&xml, config)?)
                .with_context(|| format!("{} is not a datasets packet", form.display()))?;
            Ok(infer_schema(&wrap_envelope(data)))
        }
        (None, Some(schema)) => {
            let json = read_file(&schema)?;
            schema_from_json(&json).with_context(|| format!("invalid schema in {}", schema.display()))
        }
        (None, None) => bail!("pass --form or --schema"),
    }
}

fn parse_xml(input: &str, config: Config) -> Result<TreeNode> {
    xml_to_tree_with_config(input, config).context("failed to parse xml input")
}

fn parse_json(input: &str, config: Config) -> Result<TreeNode> {
    json_to_tree_with_config(input, config).context("failed to parse json input")
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_input(path: &Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            if buffer.trim().is_empty() {
                bail!("no input provided on stdin");
            }
            Ok(buffer)
        }
    }
}

fn write_output(path: &Option<PathBuf>, data: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = io::stdout();
            stdout
                .write_all(data.as_bytes())
                .context("failed to write stdout")?;
            if !data.ends_with('\n') {
                stdout.write_all(b"\n").context("failed to write stdout")?;
            }
            Ok(())
        }
    }
}
