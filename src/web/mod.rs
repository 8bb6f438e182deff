mod error;
mod extractors;
mod handlers;
mod routes;
pub mod security;
mod state;

pub use error::AppResult;
pub use state::AppState;

use crate::{Config, Database};
use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

async fn not_found() -> crate::Error {
    crate::Error::not_found("Not found")
}

pub(crate) async fn handle_middleware_error(err: BoxError) -> crate::Error {
    if err.is::<Elapsed>() {
        crate::Error::Timeout
    } else {
        crate::Error::Internal(anyhow::anyhow!("Unhandled middleware error: {}", err))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(routes::auth_routes())
        .merge(routes::content_routes())
        .merge(routes::profile_routes())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(CompressionLayer::new())
                .layer(middleware::from_fn(security::apply_security_headers)),
        )
        .with_state(state)
}

pub async fn serve(config: Config, db: Database, addr: &str) -> Result<()> {
    let state = Arc::new(AppState::new(config, db)?);

    let limiter = state.signin_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });

    let app = router(state.clone());
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("{} listening on http://{}", state.config.site.title, addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

