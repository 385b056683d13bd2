mod logs;
mod notify;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use oficina_gateway::GatewayConfig;
use tracing_subscriber::EnvFilter;

/// Webhook gateway for the workshop manager.
#[derive(Parser)]
#[command(name = "oficina", version, about = "Workshop webhook gateway")]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(long, global = true, env = "OFICINA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook HTTP server
    Serve {
        /// Port to listen on (overrides the configured port)
        #[arg(long)]
        port: Option<u16>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Report an order status change to the webhook endpoint
    NotifyStatus {
        /// Service order number
        #[arg(long)]
        numero_os: i64,
        /// Previous status
        #[arg(long)]
        from: String,
        /// New status
        #[arg(long)]
        to: String,
        /// Webhook URL (default: the local server on the configured port)
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the latest webhook audit records as JSON lines
    Logs {
        /// Maximum number of records (0 for all)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => fail(&format!("failed to create tokio runtime: {}", e)),
    };

    let result = match cli.command {
        Commands::Serve {
            port,
            tls_cert,
            tls_key,
        } => {
            // Both TLS flags or neither.
            if tls_cert.is_some() != tls_key.is_some() {
                fail("--tls-cert and --tls-key must both be provided");
            }
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            rt.block_on(serve::start_server(config, tls_cert, tls_key))
        }
        Commands::NotifyStatus {
            numero_os,
            from,
            to,
            url,
        } => rt.block_on(notify::run(&config, numero_os, &from, &to, url)),
        Commands::Logs { limit } => rt.block_on(logs::run(&config, limit)),
    };

    if let Err(e) = result {
        fail(&e.to_string());
    }
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig, String> {
    GatewayConfig::load(path).map_err(|e| e.to_string())
}

/// Log filter from `OFICINA_LOG`, then `RUST_LOG`, else `info`. Logs go to
/// stderr so command output on stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("OFICINA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}
