use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use hatena_bookmark_mcp::config::Config;
use hatena_bookmark_mcp::server::BookmarkServer;
use hatena_bookmark_mcp::service::BookmarkService;

/// Get the default config file path (~/.config/hatena-bookmark-mcp/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("hatena-bookmark-mcp")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "hatena-bookmark-mcp",
    version,
    about = "MCP server for Hatena Bookmark public feeds (stdio transport)"
)]
struct Args {
    /// Config file (default: ~/.config/hatena-bookmark-mcp/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the service root, e.g. a local mirror
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Disable the in-memory response cache
    #[arg(long)]
    no_cache: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Picks the log filter: RUST_LOG, then LOG_LEVEL, then the config file.
fn log_filter(config_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = std::env::var("LOG_LEVEL")
        .ok()
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| matches!(l.as_str(), "trace" | "debug" | "info" | "warn" | "error"))
        .unwrap_or_else(|| config_level.to_ascii_lowercase());

    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs go to stderr; stdout carries the MCP transport.
fn init_tracing(json: bool, config_level: &str) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(config_level))
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    // Loaded before tracing is initialized, so load-time events are dropped;
    // errors still surface through the returned Result.
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if args.no_cache {
        config.cache_enabled = false;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(args.json_logs, &config.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting Hatena Bookmark MCP server"
    );

    let service = BookmarkService::from_config(&config).context("Failed to build HTTP client")?;
    let server = BookmarkServer::new(Arc::new(service));

    use rmcp::{
        service::serve_server,
        transport::{async_rw::AsyncRwTransport, io::stdio},
    };

    let (stdin, stdout) = stdio();
    let transport = AsyncRwTransport::new_server(stdin, stdout);

    let running = serve_server(server, transport)
        .await
        .context("Failed to start MCP stdio server")?;

    let reason = running.waiting().await.context("MCP stdio server error")?;
    tracing::info!(reason = ?reason, "MCP server stopped");

    Ok(())
}
