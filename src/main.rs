use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use course_checkout_api as api;
use api::payments::{PaymentProvider, StripeConfig, StripePaymentProcessor};
use api::repositories::{BaasClient, InMemoryStore, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("loading configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::handlers::health::init_start_time();

    let repos = match cfg.baas() {
        Some((url, key)) => {
            info!(baas_url = %url, "Using backend REST store");
            let client = BaasClient::new(url, key, cfg.request_timeout())
                .context("building backend client")?;
            Repositories::from_store(Arc::new(client))
        }
        None => {
            warn!("No backend configured; using the in-memory store");
            Repositories::from_store(Arc::new(InMemoryStore::new()))
        }
    };

    let stripe = StripeConfig::new(cfg.stripe_secret_key.clone())
        .with_api_base(cfg.stripe_api_base.clone())
        .with_timeout(cfg.payment_timeout());
    let payments: Arc<dyn PaymentProvider> =
        Arc::new(StripePaymentProcessor::new(stripe).context("building Stripe client")?);

    if cfg.auth_secret().is_none() {
        warn!("No APP__AUTH_JWT_SECRET configured; admin pricing updates will be refused");
    }

    let host = cfg.host.clone();
    let port = cfg.port;
    let app = api::build_router(api::AppState::new(cfg, repos, payments));

    // Bind and serve
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    info!("course-checkout-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
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
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
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
}
