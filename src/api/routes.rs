use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::FormRejection, Form, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tower_http::trace::TraceLayer;

use crate::api::flash::{redirect_with_flash, Flash};
use crate::api::models::ScrapeForm;
use crate::api::pages;
use crate::error::AppError;
use crate::history::list_history;
use crate::viewer::{self, ViewError};
use crate::AppState;

const FILTER_JS: &str = include_str!("../../static/filter.js");

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/scrape", post(scrape_handler))
        .route("/downloads/*filename", get(download_handler))
        .route("/history", get(history_handler))
        .route("/results/*filename", get(result_handler))
        .route("/static/filter.js", get(filter_js_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn index_handler(flash: Flash) -> Response {
    let page = pages::index_page(flash.message());
    flash.render(page)
}

async fn scrape_handler(
    State(state): State<AppState>,
    form: Result<Form<ScrapeForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::info!(reason = %rejection.body_text(), "unreadable scrape form");
            return redirect_with_flash(&state.config.secret_key, "/", "Invalid form submission.");
        }
    };

    let submitted = state
        .orchestrator
        .submit(&form.keyword, &form.numpage, &form.itemperpage)
        .await;

    match submitted {
        Ok(submission) => {
            tracing::info!(file = %submission.filename, "scrape stored");
            let page = pages::results_page(&submission.result, &submission.filename, None);
            axum::response::Html(page).into_response()
        }
        Err(err) => {
            match &err {
                AppError::InvalidInput(msg) => tracing::info!(reason = %msg, "rejected scrape form"),
                AppError::MissingCredentials => tracing::warn!("scrape requested without credentials"),
                other => tracing::error!(error = %other, "scrape request failed"),
            }
            redirect_with_flash(&state.config.secret_key, "/", &err.to_string())
        }
    }
}

async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let filename = store_name(&filename);
    let download = state.store.read_for_download(filename).await.map_err(|e| {
        tracing::info!(file = %filename, error = %e, "download refused");
        AppError::from(e)
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace(['"', '\r', '\n'], "_")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

async fn history_handler(State(state): State<AppState>, flash: Flash) -> Response {
    let files = list_history(&state.store).await;
    let page = pages::history_page(&files, flash.message());
    flash.render(page)
}

async fn result_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    flash: Flash,
) -> Response {
    let filename = store_name(&filename);
    match viewer::view(&state.store, filename).await {
        Ok(result) => {
            let page = pages::results_page(&result, filename, flash.message());
            flash.render(page)
        }
        Err(err) => {
            if let ViewError::Unreadable(msg) = &err {
                tracing::warn!(file = %filename, error = %msg, "stored result is unreadable");
            }
            redirect_with_flash(&state.config.secret_key, "/history", &err.to_string())
        }
    }
}

/// Catch-all captures may keep the separator; the store itself rejects
/// anything that is still not a bare file name.
fn store_name(captured: &str) -> &str {
    captured.strip_prefix('/').unwrap_or(captured)
}

async fn filter_js_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        FILTER_JS,
    )
}
