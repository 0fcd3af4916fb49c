//! annuaire-serve binary entry point

use annuaire_serve::{AnnuaireServer, ServerConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Search API for the Annuaire business directory
#[derive(Parser, Debug)]
#[command(name = "annuaire-serve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve keyword and lexical similarity search over the business directory", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Host to bind, overrides configuration
    #[arg(long = "host")]
    host: Option<String>,

    /// Port to bind, overrides configuration
    #[arg(long = "port")]
    port: Option<u16>,

    /// SQLite database path, overrides configuration
    #[arg(long = "db", value_name = "PATH")]
    db: Option<String>,
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    init_logging(&config.log_level);

    tracing::info!(
        "Configuration: host={} port={} db={} backend={} generative={}",
        config.host,
        config.port,
        config.db_path,
        config.search_backend.as_str(),
        config.generative_enabled
    );

    let server = AnnuaireServer::new(config)?;
    server.start().await?;

    Ok(())
}
