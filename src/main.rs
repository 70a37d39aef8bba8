// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use time_capsule_server::{
    api::router,
    auth::SessionSweeper,
    config::{LogFormat, ServerConfig, TlsPaths, DEFAULT_LOG_FILTER},
    state::AppState,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connections still open this long after shutdown starts are dropped.
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

async fn serve_tls(
    app: Router,
    addr: SocketAddr,
    tls: &TlsPaths,
    shutdown: CancellationToken,
) -> Result<(), BoxError> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
        }
    });

    info!(%addr, "Time capsule server listening on https (docs at /docs)");
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn serve_plain(
    app: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), BoxError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    warn!("TLS_CERT_PATH not set, serving plain HTTP");
    info!(%addr, "Time capsule server listening on http (docs at /docs)");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn run() -> Result<(), BoxError> {
    let config = ServerConfig::from_env();
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());
    let config = config?;

    let addr = config.bind_addr()?;
    let state = AppState::open(&config)?;
    info!(data_dir = %config.data_dir.display(), "Storage opened");

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let sweeper =
        tokio::spawn(SessionSweeper::new(Arc::clone(&state.sessions)).run(shutdown.clone()));

    let app = router(state);
    let served = match &config.tls {
        Some(tls) => serve_tls(app, addr, tls, shutdown.clone()).await,
        None => serve_plain(app, addr, shutdown.clone()).await,
    };

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Session sweeper task failed");
    }

    served?;
    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
