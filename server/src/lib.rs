use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use shelf_core::persist::ResourcePaths;
use shelf_core::{DistanceCache, DocumentId, RecError, Recommender};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct RecommendParams {
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 5 }

#[derive(Serialize)]
pub struct RecommendResponse {
    pub document_id: DocumentId,
    pub k: usize,
    pub took_s: f64,
    pub results: Vec<RecommendHit>,
}

#[derive(Serialize)]
pub struct RecommendHit {
    pub document_id: DocumentId,
    pub distance: f32,
    pub link: String,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub document_id: DocumentId,
    pub row: usize,
    pub topics: Vec<f32>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

/// Load resources, build or load the distance matrix, and wire the routes.
pub fn build_app(resources_dir: &str, cache_dir: &str) -> Result<Router> {
    let cache = DistanceCache::new(cache_dir);
    let recommender = Recommender::load(&ResourcePaths::new(resources_dir), &cache)?;
    tracing::info!(
        cache_key = %recommender.cache_key(),
        source = ?recommender.cache_source(),
        docs = recommender.len(),
        "recommender loaded"
    );
    Ok(router(AppState { recommender: Arc::new(recommender) }))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/recommend/:document_id", get(recommend_handler))
        .route("/doc/:document_id", get(doc_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn recommend_handler(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let start = std::time::Instant::now();
    let k = params.k.min(MAX_K);
    let recs = state.recommender.recommend(document_id, k).map_err(api_error)?;
    let results = recs
        .into_iter()
        .map(|r| RecommendHit { link: r.link(), document_id: r.document_id, distance: r.distance })
        .collect();
    Ok(Json(RecommendResponse { document_id, k, took_s: start.elapsed().as_secs_f64(), results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<DocResponse>, ApiError> {
    let rec = &state.recommender;
    let row = rec.row_of(document_id).map_err(api_error)?;
    let topics = rec.topic_vector(document_id).map_err(api_error)?.to_vec();
    Ok(Json(DocResponse { document_id, row, topics }))
}

fn api_error(e: RecError) -> ApiError {
    let status = match e {
        RecError::UnknownIdentifier(_) => StatusCode::NOT_FOUND,
        RecError::InvalidK(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}
