mod client;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use clawkeeper_config::{config_file_path, read_config, ClawkeeperConfig};
use clawkeeper_core::Sandbox;
use clawkeeper_logging::init_logger;
use clawkeeper_ops::{start_server, OpsState};
use clawkeeper_sandbox::LocalSandbox;

use client::{default_base_url, OpsClient};

#[derive(Parser)]
#[command(name = "clawkeeper")]
#[command(about = "Clawkeeper: gateway supervisor and ops API")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $CLAWKEEPER_CONFIG or ~/.clawkeeper/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of a running server, for client commands
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ops HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    #[command(flatten)]
    Client(ClientCommand),
}

/// Commands sent to a running server.
#[derive(Subcommand)]
enum ClientCommand {
    /// Ensure the gateway and show its status
    Status,
    /// Restart the gateway
    Restart,
    /// List sandbox processes
    Processes,
    /// Show captured output of the gateway or a given process
    Logs {
        #[arg(long)]
        id: Option<String>,
    },
    /// Read an allowlisted gateway config value
    ConfigGet { path: String },
    /// Write an allowlisted gateway config value
    ConfigSet { path: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config_file_path);
    let (config, report) = read_config(&config_path).await?;

    match cli.command {
        Commands::Serve { port } => {
            let _guard = init_logger(config.logging.dir.as_deref(), &config.logging.level)?;
            report.log_warnings();
            run_server(config, port).await
        }
        Commands::Client(command) => {
            // stdout carries the JSON reply; server-side config warnings stay out of it.
            let _guard = init_logger(None, "warn")?;
            let base_url = cli
                .url
                .unwrap_or_else(|| default_base_url(&config.server));
            let client = OpsClient::new(base_url, config.server.access_token.clone());
            run_client(&client, command).await
        }
    }
}

async fn run_client(client: &OpsClient, command: ClientCommand) -> Result<()> {
    match command {
        ClientCommand::Status => client.get("/status", &[]).await?,
        ClientCommand::Restart => client.post("/restart", &[]).await?,
        ClientCommand::Processes => client.get("/processes", &[]).await?,
        ClientCommand::Logs { id } => match id.as_deref() {
            Some(id) => client.get("/logs", &[("id", id)]).await?,
            None => client.get("/logs", &[]).await?,
        },
        ClientCommand::ConfigGet { path } => {
            client.get("/config/get", &[("path", path.as_str())]).await?
        }
        ClientCommand::ConfigSet { path, value } => {
            client
                .post(
                    "/config/set",
                    &[("path", path.as_str()), ("value", value.as_str())],
                )
                .await?
        }
    };
    Ok(())
}

async fn run_server(config: ClawkeeperConfig, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", config.server.bind, port))?;

    info!(
        addr = %addr,
        gateway = %config.gateway.command,
        shell = %config.sandbox.shell,
        "Starting Clawkeeper"
    );

    let sandbox: Arc<dyn Sandbox> = Arc::new(LocalSandbox::new(config.sandbox.shell.clone()));
    let state = OpsState::from_config(&config, sandbox);
    start_server(addr, state).await
}
