use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod mcp;

use config::{Config, ServerOpts};

#[derive(Parser, Debug)]
#[command(name = "datagate")]
#[command(
    about = "MCP gateway for web search, unblocked scraping and dataset collection",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (credentials come from API_TOKEN).
    McpStdio(StdioCmd),
    /// Serve MCP over streamable HTTP at /mcp (per-request credentials).
    Serve(ServeCmd),
    /// Print the resolved configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info (json).
    Version,
}

#[derive(clap::Args, Debug)]
struct StdioCmd {
    #[command(flatten)]
    opts: ServerOpts,
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[command(flatten)]
    opts: ServerOpts,
    #[arg(long, env = "DATAGATE_HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    #[command(flatten)]
    opts: ServerOpts,
}

/// Load `.env` without overriding variables already set in the process.
///
/// `DATAGATE_DOTENV=0` disables loading; `DATAGATE_ENV_FILE` picks the file.
fn load_env_file() {
    if matches!(
        std::env::var("DATAGATE_DOTENV").as_deref(),
        Ok("0") | Ok("false")
    ) {
        return;
    }
    match std::env::var("DATAGATE_ENV_FILE") {
        Ok(p) if !p.trim().is_empty() => {
            let _ = dotenvy::from_filename(p.trim());
        }
        _ => {
            let _ = dotenvy::dotenv();
        }
    }
}

/// Logs go to stderr: stdout carries the stdio transport and JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::McpStdio(cmd) => {
            mcp::serve_stdio(Config::from(cmd.opts)).await?;
        }
        Commands::Serve(cmd) => {
            let addr = std::net::SocketAddr::new(cmd.host, cmd.port);
            mcp::http::serve_http(Config::from(cmd.opts), addr).await?;
        }
        Commands::Doctor(cmd) => {
            let cfg = Config::from(cmd.opts);
            let registry = mcp::registry::ToolRegistry::new(cfg.toolset);
            let payload = serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "name": "datagate",
                "version": env!("CARGO_PKG_VERSION"),
                "api_base": datagate_upstream::api_base_from_env(),
                "configured": cfg.summary(),
                "tools": registry.names(),
            });
            println!("{payload}");
        }
        Commands::Version => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "name": "datagate",
                "version": env!("CARGO_PKG_VERSION"),
            });
            println!("{v}");
        }
    }

    Ok(())
}
