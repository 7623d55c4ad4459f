//! HTTP service reporting the next bin collections of Hackney properties.

mod app;
mod config;
mod routes;

use std::future;
use std::sync::Arc;

use anyhow::Result;
use axum::{ServiceExt, extract::Request};
use bindicator_core::{
    AddressPort, BinsGateway, CachedAddresses, CachedGateway, CollectionService,
};
use bindicator_provider_hackney::HackneyGateway;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::normalize_path::NormalizePath;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::AppState;
use crate::config::Config;

const USER_AGENT: &str = concat!("bindicator/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(_err) => info!("no .env file found, using process environment"),
    }

    let config = Config::from_env();

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout)
        .build()?;
    let hackney = Arc::new(
        HackneyGateway::new(client, &config.api_base)?
            .with_token(config.api_token.clone())
            .with_timezone(config.timezone)
            .with_refuse_types(config.refuse_types.clone()),
    );

    let bins: Arc<dyn BinsGateway> = Arc::new(CachedGateway::new(
        Arc::<HackneyGateway>::clone(&hackney),
        &config.cache,
    ));
    let addresses: Arc<dyn AddressPort> = Arc::new(CachedAddresses::new(hackney, &config.cache));

    let mut service = CollectionService::new(bins);
    if let Some(limit) = config.max_concurrency {
        service = service.with_concurrency_limit(limit);
    }

    let state = AppState {
        service: Arc::new(service),
        addresses,
        responses: config.cache.build("responses"),
        timezone: config.timezone,
    };
    let app = NormalizePath::trim_trailing_slash(app::router(state));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        address = %listener.local_addr()?,
        upstream = %config.api_base,
        cache = config.cache.enabled,
        "listening"
    );

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "cannot listen for Ctrl-C");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                warn!(%err, "cannot listen for SIGTERM");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }

    info!("shutting down");
}
