use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::AppState;
use crate::models::RequestParameters;
use crate::{cli, query, view};

const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error\n";

/// A failed request. The detail goes to the log; the client gets a bare 500.
pub struct AppError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        AppError(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        internal_error()
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain")],
        INTERNAL_ERROR_BODY,
    )
        .into_response()
}

pub(super) fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    internal_error()
}

#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn report(
    State(state): State<AppState>,
    raw_query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, AppError> {
    let started = Instant::now();

    let raw = raw_query.map(|Query(q)| q).unwrap_or_default();
    let parameters = RequestParameters::resolve(&raw);
    let row_limit = parameters.effective_limit();

    let result = query::fetch(Arc::clone(&state.database), parameters).await?;

    tracing::info!(
        row_limit,
        total = result.total_count,
        failed = result.failed_count,
        rows = result.rows.len(),
        elapsed = ?started.elapsed(),
        "constructed HTML page"
    );

    let body = Body::from_stream(view::page_stream(result, row_limit, state.cell_format));
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response())
}

pub async fn version() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], cli::version_line())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_is_bare_500() {
        let err: AppError = anyhow::anyhow!("secret table detail").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain"
        );
    }

    #[test]
    fn panic_response_is_bare_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = panic_response(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = panic_response(Box::new(7_u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
