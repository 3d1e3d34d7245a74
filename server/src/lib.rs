use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use profile_core::persist::{load_index, IndexPaths};
use profile_core::{IndexHandle, SearchHit};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Result count for `/recommend` when the query does not ask for one.
pub const DEFAULT_RECOMMEND_K: usize = 5;
const MAX_SEARCH_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct RecommendParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    /// Documents with a non-zero score, before truncation to `k`.
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub k: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: IndexHandle,
    pub index_path: PathBuf,
}

pub fn build_app(index_path: String) -> Result<Router> {
    // Load index at startup; a missing or corrupt artifact is fatal.
    let paths = IndexPaths::new(&index_path);
    let index = load_index(&paths)?;
    let app_state = AppState { index: IndexHandle::new(index), index_path: PathBuf::from(&index_path) };
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
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
        .route("/recommend", get(recommend_handler))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Intent-aware ranking: "top 3 computer vision" returns three profiles.
/// Zero-score profiles are kept so short corpora still fill `k`.
pub async fn recommend_handler(State(state): State<AppState>, Query(params): Query<RecommendParams>) -> Json<RecommendResponse> {
    let index = state.index.current();
    let (parsed, scored) = index.recommend(&params.q, DEFAULT_RECOMMEND_K);
    tracing::debug!(query = %parsed.text, k = parsed.k, "recommend");
    Json(RecommendResponse { query: parsed.text, k: parsed.k, results: index.hits(&scored) })
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let index = state.index.current();
    // Rank everything so total_hits counts every match, then cut to k.
    let mut scored = index.query(&params.q, index.len());
    scored.retain(|s| s.score > 0.0);
    let total_hits = scored.len();
    scored.truncate(params.k.clamp(1, MAX_SEARCH_K));
    let results = index.hits(&scored);

    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> (StatusCode, Json<serde_json::Value>) {
    let index = state.index.current();
    match index.document(&doc_id) {
        Some(doc) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "doc_id": doc.doc_id,
                "name": doc.meta.name,
                "specialization": doc.meta.specialization,
                "research": doc.meta.research,
                "email": doc.meta.email,
                "profile_url": doc.meta.profile_url,
            })),
        ),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))),
    }
}

/// Reloads the artifact from disk and swaps it in. On failure the current
/// index keeps serving.
async fn reload_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let paths = IndexPaths::new(&state.index_path);
    let loaded = tokio::task::spawn_blocking(move || load_index(&paths))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match loaded {
        Ok(index) => {
            let num_docs = index.len();
            state.index.swap(index);
            Ok(Json(serde_json::json!({ "num_docs": num_docs })))
        }
        Err(e) => {
            tracing::error!(error = %e, "index reload failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
