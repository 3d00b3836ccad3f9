use anyhow::{Context, Result};
use clap::Parser;
use loan_gateway::{
    api::{create_loan_api_router, AppState},
    config::Config,
    ledger::EthersLoanLedger,
};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Loan Gateway Arguments
#[derive(Parser)]
#[clap(name = "loan-gateway")]
#[clap(about = "Submits loan requests to a ledger contract and relays the confirmed transaction")]
struct Args {
    /// Path to gateway configuration file
    #[clap(long, default_value = "config/gateway.yaml")]
    config: PathBuf,

    /// Port to listen on (overrides the config file)
    #[clap(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting loan gateway...");
    info!("Config path: {:?}", args.config);

    let mut config = Config::load(&args.config).context("invalid gateway configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!("Ledger settings: {:?}", config.ledger);
    match config.endpoint.confirmation_timeout() {
        Some(limit) => info!("Confirmation timeout: {:?}", limit),
        None => info!("Confirmation timeout: none, requests wait until the ledger answers"),
    }

    let ledger = EthersLoanLedger::connect(&config.ledger)
        .await
        .context("failed to bind loan contract")?;

    let state = AppState::new(Arc::new(ledger), &config.endpoint);
    let app = create_loan_api_router(state);

    let addr = config.server.bind_address();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Loan gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
