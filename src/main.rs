// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spl_fee_relay::{
    api::router,
    config::Config,
    ledger::{LedgerClient, RpcLedgerClient},
    relay::{FeeRelay, RelayPolicy},
    state::AppState,
    storage::records::TransactionRepository,
    storage::DataPaths,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let paths = DataPaths::new(&config.data_dir);
    paths.ensure()?;
    let records = Arc::new(TransactionRepository::new(paths)?);

    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(
        config.rpc_url.clone(),
        config.rpc_timeout,
        config.blockhash_ttl_secs,
    )?);

    let policy = RelayPolicy {
        mint: config.mint,
        platform_fee_wallet: config.platform_fee_wallet,
        fee_rule: config.fee_rule,
        decimals: config.decimals,
        poll_attempts: config.poll_attempts,
        poll_interval: config.poll_interval,
        poll_timeout: config.poll_timeout,
    };
    let relay = Arc::new(FeeRelay::new(
        config.relay_keypair,
        policy,
        ledger.clone(),
        records.clone(),
    )?);
    info!(relay_address = %relay.address(), mint = %config.mint, "fee relay initialized");

    let state = AppState {
        relay,
        ledger,
        records,
        fee_rule: config.fee_rule,
        mint: config.mint,
        decimals: config.decimals,
        data_dir: config.data_dir.clone(),
    };
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    // SIGTERM from the orchestrator or Ctrl-C locally.
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
