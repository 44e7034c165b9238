use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paydesk::config::Config;
use paydesk::db::{AppState, create_pool, init_db, queries};
use paydesk::handlers;
use paydesk::payments::{StripeClient, StripeConfig};

#[derive(Parser, Debug)]
#[command(name = "paydesk")]
#[command(about = "Stripe payment intents with a webhook-fed transaction ledger")]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long)]
    database_path: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paydesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::error!("Configuration error: {}", e);
        std::process::exit(1);
    });
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(path) = cli.database_path {
        config.database_path = path;
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
        let count = queries::count_transactions(&conn).expect("Failed to count transactions");
        tracing::info!(
            "Database synchronized ({}, {} transactions)",
            config.database_path,
            count
        );
    }

    let stripe = StripeClient::new(&StripeConfig {
        secret_key: config.stripe_secret_key.clone(),
        api_base: config.stripe_api_base.clone(),
        timeout: config.stripe_timeout,
    })
    .expect("Failed to create Stripe client");

    let state = AppState {
        db: db_pool,
        stripe,
        webhook_secret: config.stripe_webhook_secret.clone(),
        webhook_tolerance_secs: config.webhook_tolerance_secs,
    };

    let app = handlers::app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server running on {}", addr);
    tracing::info!("Webhook endpoint: /webhook");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
