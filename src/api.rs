//! HTTP boundary: `/scrape` runs a scrape, `/posts` serves the grouped history.
use crate::model::{GroupedView, ScrapeResponse};
use crate::scrape::Scraper;
use crate::store::PostStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub scraper: Arc<Scraper>,
    pub source_label: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/scrape", any(scrape_handler))
        .route("/posts", get(posts_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

async fn scrape_handler(State(state): State<AppState>) -> Response {
    match state.scraper.scrape_and_store(state.store.as_ref()).await {
        Ok(report) => {
            let body = ScrapeResponse::success(report.posts.len(), state.source_label.clone());
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            error!(error = %err, "scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ScrapeResponse::failure(err)),
            )
                .into_response()
        }
    }
}

async fn posts_handler(State(state): State<AppState>) -> Result<Json<GroupedView>, StoreFault> {
    let posts = state.store.all().await.map_err(StoreFault)?;
    info!(count = posts.len(), "serving stored posts");
    Ok(Json(GroupedView::from_records(posts)))
}

/// Storage failure on the read path. Logged in full, reported as a bare 500.
#[derive(Debug)]
pub struct StoreFault(anyhow::Error);

impl IntoResponse for StoreFault {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "read failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
