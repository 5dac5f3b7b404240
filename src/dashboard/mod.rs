mod handlers;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::query::Database;
use crate::view::CellFormat;

pub use handlers::AppError;

#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub cell_format: CellFormat,
}

impl From<&Config> for AppState {
    fn from(config: &Config) -> Self {
        Self {
            database: Arc::new(config.database.clone()),
            cell_format: config.cell_format,
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration, verbose: bool) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::report))
        .route("/version", get(handlers::version));
    let app = harden(routes, request_timeout).with_state(state);

    if verbose {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

/// Security headers wrap everything else, so timeout and panic responses
/// carry them too.
fn harden(routes: Router<AppState>, request_timeout: Duration) -> Router<AppState> {
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(middleware::from_fn(security_headers))
}

pub async fn run(config: Config) -> Result<()> {
    let addr = resolve_bind(&config.bind, config.port).await?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind to {addr}"))?;

    let app = router(
        AppState::from(&config),
        config.request_timeout,
        config.verbose,
    );

    tracing::info!(%addr, "serving command history");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn resolve_bind(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("cannot resolve bind address {host}"))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("invalid bind address provided: {host}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn security_headers(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'none'; style-src 'unsafe-inline'"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static(
            "geolocation=(), midi=(), sync-xhr=(), microphone=(), camera=(), \
             magnetometer=(), gyroscope=(), fullscreen=(), payment=()",
        ),
    );
    headers.insert(
        "Cross-Origin-Embedder-Policy",
        HeaderValue::from_static("require-corp"),
    );
    headers.insert(
        "Cross-Origin-Opener-Policy",
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        "Cross-Origin-Resource-Policy",
        HeaderValue::from_static("same-site"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
