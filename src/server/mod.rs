//! HTTP surface.
//!
//! # Routes
//!
//! - `GET /` - plain-text index
//! - `GET /healthz` - liveness probe
//! - `GET /feed?type=...` - category chosen by query parameter
//! - `GET /sdz`, `/kabinet_lora`, `/photo`, `/zavtracast` - fixed-category aliases
//!
//! Every request is logged with user agent, method, URI and elapsed time.

mod error;
mod handlers;

use axum::extract::Request;
use axum::http::header::USER_AGENT;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::source::SourceCache;

pub use error::AppError;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<SourceCache>,
}

impl AppState {
    pub fn new(config: Arc<Config>, cache: Arc<SourceCache>) -> Self {
        Self { config, cache }
    }
}

/// Builds the router with all feed endpoints and request logging.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route("/feed", get(handlers::feed))
        .route("/sdz", get(handlers::sdz))
        .route("/kabinet_lora", get(handlers::kabinet_lora))
        .route("/photo", get(handlers::photo))
        .route("/zavtracast", get(handlers::zavtracast))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serves `state` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    tracing::info!(
        user_agent = %user_agent,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}
