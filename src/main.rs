// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tuition_server::{
    api::router,
    auth::TokenService,
    budget::BudgetResetter,
    config::{AppConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    state::AppState,
    storage::{InMemoryLedger, LedgerDatabase, RequestLog},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Tuition server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::from_env()?;

    // Must happen before any TLS configuration is built.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let request_log = RequestLog::open(&config.request_log_path)?;
    tracing::info!(path = %request_log.path().display(), "Request log opened");
    let tokens = TokenService::new(config.jwt_secret.as_bytes());

    let state = match &config.ledger_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Opening ledger database");
            let db = LedgerDatabase::open(path, config.daily_limit)?;
            AppState::new(Arc::new(db), tokens, request_log)
        }
        None => {
            tracing::warn!("No ledger path configured, using in-memory ledger");
            let ledger = InMemoryLedger::new(config.daily_limit);
            AppState::new(Arc::new(ledger), tokens, request_log)
        }
    };

    let shutdown = CancellationToken::new();
    let resetter = config.budget_reset_interval.map(|interval| {
        let task =
            BudgetResetter::new(state.ledger.clone(), config.daily_limit).with_interval(interval);
        tokio::spawn(task.run(shutdown.clone()))
    });

    let request_log = state.request_log.clone();
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone(), shutdown.clone()));

    let served = match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            tracing::info!(
                addr = %config.bind_addr,
                "Tuition server listening on https (docs at /docs)"
            );
            axum_server::bind_rustls(config.bind_addr, tls_config)
                .handle(handle)
                .serve(app)
                .await
        }
        None => {
            tracing::info!(
                addr = %config.bind_addr,
                "Tuition server listening on http (docs at /docs)"
            );
            axum_server::bind(config.bind_addr).handle(handle).serve(app).await
        }
    };

    shutdown.cancel();
    if let Some(task) = resetter {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Budget reset task ended abnormally");
        }
    }
    if let Err(e) = request_log.flush() {
        tracing::warn!(error = %e, "Failed to flush request log");
    }

    served?;
    tracing::info!("Tuition server stopped");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle<SocketAddr>, shutdown: CancellationToken) {
    wait_for_signal().await;
    tracing::info!("Shutdown signal received, draining connections");
    begin_shutdown(&handle, &shutdown);
}

fn begin_shutdown(handle: &Handle<SocketAddr>, shutdown: &CancellationToken) {
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_shutdown_stops_server_and_background_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let log = RequestLog::open(dir.path().join("api.log")).unwrap();
        let state = AppState::new(
            Arc::new(InMemoryLedger::new(1)),
            TokenService::new(b"shutdown-test-secret"),
            log,
        );
        let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

        let handle = Handle::new();
        let shutdown = CancellationToken::new();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = tokio::spawn(axum_server::bind(addr).handle(handle.clone()).serve(app));
        assert!(handle.listening().await.is_some());

        begin_shutdown(&handle, &shutdown);
        assert!(shutdown.is_cancelled());
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
