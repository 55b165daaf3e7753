//! Bybit MCP Server - Entry Point
//!
//! Provides both stdio and HTTP transports.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bybit_mcp::{BybitClient, config::Config, server::McpServer};

#[derive(Parser, Debug)]
#[command(name = "bybit-mcp")]
#[command(about = "MCP server for the Bybit trading API")]
#[command(version)]
struct Cli {
    /// Transport mode: stdio or http
    #[arg(long, default_value = "http")]
    transport: Transport,

    /// HTTP server port (only used with --transport http)
    #[arg(long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Public base URL, used as OAuth issuer (e.g., https://bybit-mcp.example.com)
    #[arg(long, env = "SERVICE_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Transport {
    /// Standard input/output
    Stdio,
    /// Stateless Streamable HTTP
    #[default]
    Http,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout is reserved for the stdio transport.
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if json {
        subscriber.with(layer.json()).init();
    } else {
        subscriber.with(layer.compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = Config::from_env()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?cli.transport,
        testnet = config.testnet,
        bybit_credentials = config.has_credentials(),
        oauth = config.oauth.is_some(),
        "Starting Bybit MCP server"
    );

    let oauth = config.oauth.clone();
    let client = BybitClient::new(config)?;
    let server = McpServer::new(client, oauth);

    match cli.transport {
        Transport::Stdio => {
            server.run_stdio().await?;
        }
        Transport::Http => {
            tracing::info!(port = cli.port, base_url = ?cli.base_url, "Running in HTTP mode");
            server.run_http(cli.port, cli.base_url).await?;
        }
    }

    Ok(())
}
