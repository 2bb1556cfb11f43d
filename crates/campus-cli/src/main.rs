//! Campus CLI
//!
//! Establishes a secure session with the Campus API server at startup and
//! issues calls over it.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use campus_cli::auth_cmd::{self, AuthAction};
use campus_cli::client::{self, CampusClient};
use campus_cli::server_cmd::{self, ServerAction};
use campus_core::config::load_config;
use campus_core::tracing_init::{default_filter, init_tracing};
use campus_core::{Config, SecurityMode, ServerTarget};

#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(version, about = "Campus API client", long_about = None)]
struct Cli {
    /// Config file (JSON), layered over the global settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API server base URL (remembered for later runs)
    #[arg(short, long)]
    server: Option<String>,

    /// Override transport security detection: auto, secure or insecure
    #[arg(long)]
    security: Option<SecurityMode>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a session and print its details.
    Handshake,
    /// Open a session and call one route.
    Call {
        /// Route, e.g. `/get-student-by-id`.
        route: String,
        /// JSON payload.
        #[arg(default_value = "{}")]
        payload: String,
    },
    /// Sign in, sign out or check the stored token.
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Show or change the API server.
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server.url = Some(server);
    }
    if let Some(security) = cli.security {
        config.server.security = security;
    }
    init_tracing(
        &default_filter(&config.log.level),
        cli.log_json || config.log.json,
    );
    info!(version = env!("CARGO_PKG_VERSION"), "Starting campus CLI");

    let mut target = match client::server_info_path() {
        Some(path) => {
            let mut target = ServerTarget::load(&path)?;
            target.persist_to(path);
            target
        }
        None => ServerTarget::new(),
    };

    match cli.command {
        Commands::Server { action } => server_cmd::run(action, &mut target)?,
        Commands::Handshake => {
            client::resolve_server(&mut config, &mut target)?;
            handshake(&config, &target).await?;
        }
        Commands::Call { route, payload } => {
            client::resolve_server(&mut config, &mut target)?;
            call(&config, &target, &route, &payload).await?;
        }
        Commands::Auth { action } => {
            client::resolve_server(&mut config, &mut target)?;
            let path = client::credential_path()
                .ok_or_else(|| anyhow::anyhow!("Cannot determine a config directory"))?;
            auth_cmd::run(action, &config, &target, &path).await?;
        }
    }

    Ok(())
}

async fn handshake(config: &Config, target: &ServerTarget) -> anyhow::Result<()> {
    let client = CampusClient::connect_or_explain(config, target).await?;
    let session = &client.session;
    let transport = if client.dispatcher.transport().security().is_secure() {
        "secure"
    } else {
        "insecure (payloads encrypted)"
    };

    let mut out = io::stdout();
    writeln!(out, "Session:     {}", session.session_id())?;
    writeln!(out, "API version: {}", session.api_version())?;
    writeln!(out, "Transport:   {transport}")?;
    Ok(())
}

async fn call(
    config: &Config,
    target: &ServerTarget,
    route: &str,
    payload: &str,
) -> anyhow::Result<()> {
    let payload: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| anyhow::anyhow!("Payload is not valid JSON: {e}"))?;
    let client = CampusClient::connect_or_explain(config, target).await?;
    let response: serde_json::Value = client.dispatcher.call(route, &payload).await?;

    let mut out = io::stdout();
    writeln!(out, "{}", serde_json::to_string_pretty(&response)?)?;
    Ok(())
}
