//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use dynrepo_core::{DynRepository, Enricher};
use dynrepo_shared::{
    AppConfig, CatalogRecord, Constraint, DEFAULT_MAX_RECORDS, QueryOptions, SortBy, init_config,
    load_config, load_config_from,
};
use dynrepo_storage::{CatalogStore, database_path};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dynrepo: enriched ISO 19139 records from a CSW catalog table.
#[derive(Parser)]
#[command(
    name = "dynrepo",
    version,
    about = "Look up catalog records and render them as ISO 19139 XML.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to $PYCSW_CONFIG).
    #[arg(long, env = "PYCSW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch records by identifier and print their XML.
    Get {
        /// Record identifiers.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print the enriched records as JSON instead of bare XML.
        #[arg(long)]
        json: bool,
    },

    /// Run a filtered search and print the matching page.
    Search {
        /// SQL where clause with `?` placeholders.
        #[arg(long = "where", default_value = "1=1")]
        where_clause: String,

        /// Values bound to the where clause placeholders, in order.
        #[arg(long = "value")]
        values: Vec<String>,

        /// Sort property, optionally suffixed with `:asc` or `:desc`.
        #[arg(long)]
        sort: Option<String>,

        /// Restrict to these type names (repeatable).
        #[arg(long = "typename")]
        typenames: Vec<String>,

        /// Maximum number of records to return.
        #[arg(long, default_value_t = DEFAULT_MAX_RECORDS)]
        limit: u32,

        /// Zero-based offset of the first record.
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Print the enriched records as JSON instead of bare XML.
        #[arg(long)]
        json: bool,
    },

    /// Enrich records read from a JSON file (no database needed).
    Render {
        /// JSON file holding one record or an array of records.
        #[arg(long)]
        input: PathBuf,
    },

    /// Load records from a JSON file into the configured catalog table.
    Import {
        /// JSON file holding one record or an array of records.
        #[arg(long)]
        input: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a starter config file.
    Init {
        /// Where to write it.
        #[arg(default_value = "dynrepo.toml")]
        path: PathBuf,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!(
        "dynrepo={level},dynrepo_core={level},dynrepo_storage={level},dynrepo_shared={level}"
    );

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Get { ids, json } => cmd_get(config_path.as_deref(), &ids, json).await,
        Command::Search {
            where_clause,
            values,
            sort,
            typenames,
            limit,
            offset,
            json,
        } => {
            let sort_by = sort.as_deref().map(str::parse::<SortBy>).transpose()?;
            let options = QueryOptions {
                sort_by,
                typenames,
                max_records: limit,
                start_position: offset,
            };
            let constraint = Constraint::new(where_clause, values);
            cmd_search(config_path.as_deref(), &constraint, &options, json).await
        }
        Command::Render { input } => cmd_render(config_path.as_deref(), &input),
        Command::Import { input } => cmd_import(config_path.as_deref(), &input).await,
        Command::Config { action } => match action {
            ConfigAction::Init { path } => cmd_config_init(&path),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

/// Load the config from `--config`, falling back to `$PYCSW_CONFIG`.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_get(config_path: Option<&Path>, ids: &[String], json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let repo = DynRepository::from_config(&config).await?;

    info!(count = ids.len(), "looking up records");
    let records = repo.query_ids(ids).await?;
    if records.len() < ids.len() {
        eprintln!("{} of {} identifiers not found", ids.len() - records.len(), ids.len());
    }

    print_records(&records, json)
}

async fn cmd_search(
    config_path: Option<&Path>,
    constraint: &Constraint,
    options: &QueryOptions,
    json: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let repo = DynRepository::from_config(&config).await?;

    let (total, records) = repo.query(constraint, options).await?;
    eprintln!(
        "{total} matching record(s), returning {} from offset {}",
        records.len(),
        options.start_position
    );

    print_records(&records, json)
}

fn cmd_render(config_path: Option<&Path>, input: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let enricher = Enricher::from_config(&config.dynamic)?;

    let mut records = read_records(input)?;
    enricher.enrich_records(&mut records)?;

    print_records(&records, false)
}

async fn cmd_import(config_path: Option<&Path>, input: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let records = read_records(input)?;

    let path = database_path(&config.repository.database)?;
    let store = CatalogStore::open(&path, &config.repository.table).await?;
    for record in &records {
        store.upsert_record(record).await?;
    }

    info!(count = records.len(), table = store.table(), "imported records");
    println!("Imported {} record(s) into {}", records.len(), store.table());
    Ok(())
}

fn cmd_config_init(path: &Path) -> Result<()> {
    let path = init_config(path)?;
    println!("Created config file at {}", path.display());
    println!("Point PYCSW_CONFIG at it and adjust the database and template paths.");
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let content = toml::to_string_pretty(&config)?;
    println!("{content}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read one record or an array of records from a JSON file.
fn read_records(path: &Path) -> Result<Vec<CatalogRecord>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))?;

    let records = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|r| vec![r])
    };
    records.map_err(|e| eyre!("invalid record in {}: {e}", path.display()))
}

fn print_records(records: &[CatalogRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    for record in records {
        if let Some(xml) = &record.xml {
            println!("{xml}");
        }
    }
    Ok(())
}
