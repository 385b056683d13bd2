//! `oficina serve`: the webhook gateway over HTTP.
//!
//! Plain HTTP by default. With the `tls` feature and both `--tls-cert` and
//! `--tls-key`, the server listens over HTTPS using `axum-server` with rustls.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use oficina_gateway::{build_router, AppState, GatewayConfig, WEBHOOK_PATH};

/// How long in-flight HTTPS connections get to finish after Ctrl+C.
#[cfg(feature = "tls")]
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(10);

pub async fn start_server(
    config: GatewayConfig,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET not set; every webhook call will be rejected");
    }
    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_seconds = config.rate_limit.window_seconds,
        "rate limit per client address"
    );

    let port = config.port;
    let state = Arc::new(AppState::from_config(&config));
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let handle = axum_server::Handle::new();
        let watcher = handle.clone();
        spawn_shutdown_watcher(shutdown_signal(), move || {
            watcher.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
        tracing::info!("webhook gateway listening on https://{}{}", addr, WEBHOOK_PATH);
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
        tracing::info!("server shut down");
        return Ok(());
    }

    #[cfg(not(feature = "tls"))]
    if _tls_cert.is_some() {
        return Err("TLS requires building with the `tls` feature".into());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("webhook gateway listening on http://{}{}", addr, WEBHOOK_PATH);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Run `on_signal` once `signal` resolves.
#[cfg(feature = "tls")]
fn spawn_shutdown_watcher<S, F>(signal: S, on_signal: F)
where
    S: std::future::Future<Output = ()> + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        signal.await;
        on_signal();
    });
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

#[cfg(all(test, feature = "tls"))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn handle_stops_server_when_signal_fires() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = axum_server::Handle::new();
        let watcher = handle.clone();
        spawn_shutdown_watcher(
            async move {
                let _ = rx.await;
            },
            move || watcher.graceful_shutdown(Some(Duration::from_millis(100))),
        );

        let app = build_router(std::sync::Arc::new(AppState::from_config(
            &GatewayConfig::default(),
        )));
        let server = tokio::spawn(
            axum_server::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
                .handle(handle.clone())
                .serve(app.into_make_service_with_connect_info::<SocketAddr>()),
        );
        assert!(handle.listening().await.is_some());

        tx.send(()).unwrap();
        let stopped = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops after the signal");
        assert!(stopped.unwrap().is_ok());
    }
}
