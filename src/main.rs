//! Versioned API router (v1)
//!
//! ```text
//!     Client Request
//!     ─────────────▶ axum (trace, body limit)
//!                        │
//!                        ▼
//!                    Dispatcher ──▶ plugins
//!                        │
//!                        ▼
//!          route table (first match, per method)
//!           │               │                 │
//!           ▼               ▼                 ▼
//!   middleware chain   legacy proxy   unknown version / catch-all
//!           │
//!           ▼
//!        handler
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_router::config::{load_config, ConfigWatcher};
use api_router::lifecycle::{spawn_signal_handler, Shutdown};
use api_router::observability::{logging, metrics};
use api_router::security::{sign_token, PrivLevel};
use api_router::{api, ApiServer};

#[derive(Parser)]
#[command(name = "api-router")]
#[command(about = "Versioned HTTP API router", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the API
    Serve {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Reload routing configuration when the file changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Mint a bearer token signed with the primary secret
    Token {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        priv_level: PrivLevel,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, watch } => serve(config, watch).await,
        Commands::Token {
            config,
            user,
            priv_level,
        } => {
            let config = load_config(&config)?;
            let secret = config.primary_secret().ok_or("no secrets configured")?;
            println!("{}", sign_token(secret, &user, priv_level));
            Ok(())
        }
    }
}

async fn serve(path: PathBuf, watch: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&path)?;
    if let Err(e) = logging::init(&config.observability) {
        eprintln!("logging already initialized: {e}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        "api-router starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout = ?config.request_timeout(),
        legacy_backend = config.legacy.url.as_deref().unwrap_or("-"),
        plugins = ?config.plugins.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = ApiServer::new(config, api::declarations())?;

    // The watcher must stay alive for updates to flow.
    let (updates, _watcher) = if watch {
        let (watcher, updates) = ConfigWatcher::new(&path);
        (updates, Some(watcher.run()?))
    } else {
        let (_tx, updates) = mpsc::unbounded_channel();
        (updates, None)
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    server.run(listener, updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
