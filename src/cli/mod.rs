//! Command-line interface.

mod cache;
mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portico::config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "portico", version, about = "Multi-tenant read-through cache for JSON APIs")]
pub struct Cli {
    /// Path to a JSON config file (default: $PORTICO_CONFIG or ./portico.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Refetch endpoints from upstream into the cache
    Refresh {
        #[arg(required = true)]
        endpoints: Vec<String>,
        /// Tenant (default: configured default tenant)
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Remove endpoints from the cache
    Evict {
        #[arg(required = true)]
        endpoints: Vec<String>,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Query a cached endpoint and print the result
    Query {
        endpoint: String,
        #[arg(long)]
        tenant: Option<String>,
        /// `field:asc|desc|random`
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        skip: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        /// Filter as `key=value`; bracket syntax such as `age[$gt]=30` works
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
}

/// Load configuration, install logging and dispatch the subcommand.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(config.log_format);

    match cli.command {
        Command::Serve { bind, port } => serve::cmd_serve(config, bind, port).await,
        Command::Refresh { endpoints, tenant } => {
            cache::cmd_refresh(config, endpoints, tenant).await
        }
        Command::Evict { endpoints, tenant } => cache::cmd_evict(config, endpoints, tenant).await,
        Command::Query {
            endpoint,
            tenant,
            sort,
            search,
            skip,
            limit,
            filters,
        } => {
            let options = cache::QueryOptions {
                tenant,
                sort,
                search,
                skip,
                limit,
                filters,
            };
            cache::cmd_query(config, endpoint, options).await
        }
    }
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    // A second init (tests, embedding) is harmless.
    let _ = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
}
