use std::{sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    fitgate_config::FitgateConfig,
    fitgate_oauth::{ConnectionState, TokenLifecycle},
    fitgate_vault::{FileVault, SecretVault},
};

#[derive(Parser)]
#[command(name = "fitgate", about = "Fitgate — delegated-access gateway for Fitbit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Serve {
        /// Bind address (overrides config).
        #[arg(long)]
        bind: Option<String>,
        /// Listen port (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show whether a delegated identity is connected.
    Status,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn build_lifecycle(config: &FitgateConfig) -> anyhow::Result<Arc<TokenLifecycle>> {
    let vault_path = config.vault.resolved_path();
    let vault: Arc<dyn SecretVault> = Arc::new(FileVault::new(vault_path));
    let lifecycle = TokenLifecycle::new(
        config.provider.clone(),
        vault,
        Duration::from_secs(config.pkce.attempt_ttl_secs),
    )?;
    Ok(Arc::new(lifecycle))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = fitgate_config::discover_and_load();
    if config.provider.client_id.is_empty() {
        anyhow::bail!(
            "no OAuth client id configured; set FITGATE_CLIENT_ID or [provider].client_id"
        );
    }

    match cli.command {
        Commands::Serve { bind, port } => {
            info!(version = env!("CARGO_PKG_VERSION"), "fitgate starting");
            let lifecycle = build_lifecycle(&config)?;
            let bind = bind.unwrap_or_else(|| config.gateway.bind.clone());
            let port = port.unwrap_or(config.gateway.port);
            fitgate_gateway::start_gateway(&bind, port, lifecycle).await
        },
        Commands::Status => {
            let lifecycle = build_lifecycle(&config)?;
            match lifecycle.connection_state().await? {
                ConnectionState::Connected { version } => {
                    println!("connected (refresh credential version {version})");
                },
                ConnectionState::Disconnected => {
                    println!("not connected — run `fitgate serve` and visit /auth/start");
                },
            }
            Ok(())
        },
    }
}
