//! # Dealer Catalog CLI (`dcat`)
//!
//! Loads dealer product export files into an in-memory catalog and either
//! answers one query or serves the catalog to chat clients.
//!
//! ## Usage
//!
//! ```bash
//! dcat [--config dcat.toml] [--path <pattern>]... <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dcat load` | Load and report counts and files per dealer |
//! | `dcat search [QUERY]` | Filter products (dealer, ids, status, DC/region) |
//! | `dcat get <SKU>` | Print one product as JSON |
//! | `dcat dealers` | List dealers with product counts |
//! | `dcat dealer <ID>` | Status counts, DCs and files for one dealer |
//! | `dcat dcs` | Product counts per distribution center |
//! | `dcat summary` | Catalog-wide totals |
//! | `dcat files` | Loaded source files per dealer |
//! | `dcat serve http` | HTTP tool API plus MCP Streamable HTTP at `/mcp` |
//! | `dcat serve stdio` | MCP over stdin/stdout |
//!
//! ## Examples
//!
//! ```bash
//! dcat --path './exports/*.jsonl' search hammer --status active
//! dcat --path './exports/**/*.json' search --dc-code 10 --region US --limit 20
//! dcat --config ./dcat.toml serve http
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use dealer_catalog::cli::{self, LoadOverrides};
use dealer_catalog::config::{self, Config};
use dealer_catalog::query::{SearchCriteria, DEFAULT_LIMIT};
use dealer_catalog::traits::{ToolContext, ToolRegistry};
use dealer_catalog::{mcp, server};

/// Dealer Catalog CLI: ingest dealer product exports and query them.
#[derive(Parser)]
#[command(
    name = "dcat",
    about = "Dealer Catalog: ingest dealer product exports and query them",
    version,
    long_about = "Loads per-dealer JSON / JSONL product exports into one normalized in-memory \
    catalog and answers search and aggregation queries from the command line, over HTTP, \
    or over MCP."
)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// File path or glob pattern to load (repeatable). Replaces the
    /// configured preload list.
    #[arg(long = "path", global = true)]
    paths: Vec<String>,

    /// Attribute every loaded record to this dealer.
    #[arg(long, global = true)]
    as_dealer: Option<String>,

    /// Do not infer dealers from `products-<dealer>-*` file names.
    #[arg(long, global = true)]
    no_infer_dealer: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load the configured files and report what was ingested.
    Load,

    /// Search products. All supplied filters must match.
    Search {
        /// Case-insensitive text matched against identifiers, names and descriptions.
        query: Option<String>,

        #[arg(long)]
        dealer_id: Option<String>,

        #[arg(long)]
        sku: Option<String>,

        #[arg(long)]
        mpn: Option<String>,

        #[arg(long)]
        upc: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Distribution center code.
        #[arg(long)]
        dc_code: Option<String>,

        /// Region code (e.g. `US`, `CA`); must be flagged available.
        #[arg(long)]
        region: Option<String>,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,

        /// Page size, 1 to 200.
        #[arg(long, default_value_t = DEFAULT_LIMIT, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Print the first product with this SKU as JSON.
    Get {
        sku: String,

        /// Only consider this dealer's products.
        #[arg(long)]
        dealer_id: Option<String>,
    },

    /// List dealers in first-seen order.
    Dealers,

    /// Summarize one dealer.
    Dealer {
        dealer_id: String,
    },

    /// Count products per distribution center.
    Dcs {
        #[arg(long)]
        dealer_id: Option<String>,
    },

    /// Catalog-wide totals by dealer, status and DC.
    Summary,

    /// List loaded source files per dealer.
    Files,

    /// Serve the catalog to chat clients.
    Serve {
        #[command(subcommand)]
        transport: ServeTransport,
    },
}

/// Server transports.
#[derive(Subcommand)]
enum ServeTransport {
    /// HTTP tool API and MCP Streamable HTTP on `[server].bind`.
    Http,
    /// MCP over stdin/stdout.
    Stdio,
}

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    init_tracing(&cfg);

    let overrides = LoadOverrides {
        paths: cli.paths,
        dealer_id: cli.as_dealer,
        no_infer_dealer: cli.no_infer_dealer,
    };
    let request = cli::load_request(&cfg, &overrides);
    let serving = matches!(cli.command, Commands::Serve { .. });
    let catalog = cli::preload(&request, !serving)?;

    match cli.command {
        Commands::Load => cli::run_load(&catalog)?,
        Commands::Search {
            query,
            dealer_id,
            sku,
            mpn,
            upc,
            status,
            dc_code,
            region,
            offset,
            limit,
        } => {
            let criteria = SearchCriteria {
                dealer_id,
                query,
                sku,
                mpn,
                upc,
                status,
                dc_code,
                region,
            };
            cli::run_search(&catalog, &criteria, offset, limit)?;
        }
        Commands::Get { sku, dealer_id } => cli::run_get(&catalog, &sku, dealer_id.as_deref())?,
        Commands::Dealers => cli::run_dealers(&catalog)?,
        Commands::Dealer { dealer_id } => cli::run_dealer(&catalog, &dealer_id)?,
        Commands::Dcs { dealer_id } => cli::run_dcs(&catalog, dealer_id.as_deref())?,
        Commands::Summary => cli::run_summary(&catalog)?,
        Commands::Files => cli::run_files(&catalog)?,
        Commands::Serve { transport } => match transport {
            ServeTransport::Http => server::run_server(&cfg, catalog).await?,
            ServeTransport::Stdio => {
                let ctx = ToolContext::new(Arc::new(cfg), catalog);
                mcp::run_stdio(ctx, Arc::new(ToolRegistry::new())).await?;
            }
        },
    }

    Ok(())
}
