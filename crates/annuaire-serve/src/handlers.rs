//! HTTP handlers for REST API endpoints

use annuaire_recherche::{extract_from, BusinessSource, CorpusEntry, KeywordFilter, SearchService};
use annuaire_stockage::{BusinessRecord, Storage};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::auth::require_admin;
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::responses::{
    IndexStatusResponse,
    ReindexResponse,
    SearchResultsResponse,
};

/// Query parameters for the keyword endpoint
#[derive(Debug, Default, Deserialize)]
pub struct KeywordQuery {
    /// Substring to look for; empty lists the best rated businesses
    pub query: Option<String>,
}

/// Query parameters for the semantic endpoint
///
/// `top_k` stays a string so a malformed value gets our own error body.
#[derive(Debug, Default, Deserialize)]
pub struct SemanticQuery {
    /// Free-text query
    pub query: Option<String>,

    /// Maximum number of results
    pub top_k: Option<String>,
}

/// State shared across all handlers
///
/// Uses `Arc<Mutex<Storage>>` because `rusqlite::Connection` is not `Sync`.
/// Handlers lock the mutex inside `spawn_blocking` and only around store
/// reads; index fits and ranking run with it released.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe storage access requiring mutex lock
    pub storage: Arc<Mutex<Storage>>,

    /// Process-wide lexical index
    pub search: Arc<SearchService>,

    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create state with a fresh, unbuilt search service
    pub fn new(storage: Storage, config: ServerConfig) -> Self {
        let search = SearchService::new(config.search_backend);
        Self::new_from_arc(Arc::new(Mutex::new(storage)), Arc::new(search), config)
    }

    /// Create state from already shared storage and search service
    pub fn new_from_arc(
        storage: Arc<Mutex<Storage>>,
        search: Arc<SearchService>,
        config: ServerConfig,
    ) -> Self {
        Self {
            storage,
            search,
            config: Arc::new(config),
        }
    }
}

/// Lock the shared store, mapping poisoning to a 500
pub(crate) fn lock_storage(storage: &Mutex<Storage>) -> ApiResult<MutexGuard<'_, Storage>> {
    storage
        .lock()
        .map_err(|e| ApiError::internal(format!("Storage lock poisoned: {}", e)))
}

/// Read the whole corpus, holding the store lock only for the read
pub(crate) fn load_corpus(storage: &Mutex<Storage>) -> ApiResult<Vec<CorpusEntry>> {
    let storage = lock_storage(storage)?;
    Ok(extract_from(&*storage)?)
}

/// Resolve the `top_k` parameter
///
/// Missing means `default`; anything that is not an integer is a 400 and an
/// integer below 1 is a 422.
pub fn parse_top_k(raw: Option<&str>, default: usize) -> ApiResult<usize> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::invalid_parameter("top_k", raw))?;

    if value < 1 {
        return Err(ApiError::validation(format!(
            "top_k must be at least 1, got {}",
            value
        )));
    }

    usize::try_from(value).map_err(|_| ApiError::invalid_parameter("top_k", raw))
}

/// Keep `ids` order, dropping IDs no longer present in `found`
fn in_rank_order(ids: &[i64], found: Vec<BusinessRecord>) -> Vec<BusinessRecord> {
    let mut by_id: HashMap<i64, BusinessRecord> =
        found.into_iter().map(|b| (b.id, b)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// GET /api/search/keyword/ - Substring search, best rated first
pub async fn keyword_search(
    State(state): State<AppState>,
    Query(params): Query<KeywordQuery>,
) -> ApiResult<Json<SearchResultsResponse>> {
    let query = params.query.unwrap_or_default();
    let filter = KeywordFilter::new(state.config.keyword_limit);
    let storage = Arc::clone(&state.storage);

    let records = tokio::task::spawn_blocking(move || -> ApiResult<Vec<BusinessRecord>> {
        let storage = lock_storage(&storage)?;
        Ok(filter.search(&*storage, &query)?)
    })
    .await??;

    Ok(Json(SearchResultsResponse::from_records(&records)))
}

/// GET /api/search/semantic/ - Ranked lexical similarity search
///
/// The first query after startup builds the index when it is empty.
pub async fn semantic_search(
    State(state): State<AppState>,
    Query(params): Query<SemanticQuery>,
) -> ApiResult<Json<SearchResultsResponse>> {
    let top_k = parse_top_k(params.top_k.as_deref(), state.config.default_top_k)?;
    let query = params.query.unwrap_or_default();
    if query.is_empty() {
        return Ok(Json(SearchResultsResponse::empty()));
    }

    let storage = Arc::clone(&state.storage);
    let search = Arc::clone(&state.search);

    let records = tokio::task::spawn_blocking(move || -> ApiResult<Vec<BusinessRecord>> {
        search.ensure_built_with(|| load_corpus(&storage))?;
        let ids = search.rank(&query, top_k)?;
        let found = lock_storage(&storage)?.businesses_by_ids(&ids)?;
        let ranked = in_rank_order(&ids, found);
        if ranked.len() < ids.len() {
            warn!(
                "Dropped {} stale IDs from semantic results; consider reindexing",
                ids.len() - ranked.len()
            );
        }
        debug!("Semantic query '{}' resolved {} businesses", query, ranked.len());
        Ok(ranked)
    })
    .await??;

    Ok(Json(SearchResultsResponse::from_records(&records)))
}

/// POST /api/search/reindex/ - Rebuild the index from the whole store (admin)
pub async fn reindex(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<ReindexResponse>)> {
    require_admin(&headers, &state.config)?;

    let storage = Arc::clone(&state.storage);
    let search = Arc::clone(&state.search);

    let indexed = tokio::task::spawn_blocking(move || -> ApiResult<usize> {
        search.reindex_with(|| load_corpus(&storage))
    })
    .await??;

    info!("Reindexed {} businesses", indexed);
    Ok((StatusCode::CREATED, Json(ReindexResponse { indexed })))
}

/// GET /api/search/status/ - Describe the published index
pub async fn index_status(State(state): State<AppState>) -> ApiResult<Json<IndexStatusResponse>> {
    Ok(Json(state.search.status()?.into()))
}

/// GET /health/ - Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "annuaire-serve",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}

/// Create router with all API endpoints
///
/// Each endpoint answers with and without the trailing slash.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/search/keyword/", get(keyword_search))
        .route("/api/search/keyword", get(keyword_search))
        .route("/api/search/semantic/", get(semantic_search))
        .route("/api/search/semantic", get(semantic_search))
        .route("/api/search/reindex/", post(reindex))
        .route("/api/search/reindex", post(reindex))
        .route("/api/search/status/", get(index_status))
        .route("/api/search/status", get(index_status))
        .fallback(not_found)
}

/// CORS policy from the configured origins; unparsable origins are skipped
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Router with state, CORS and (when enabled) request tracing applied
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let enable_logging = state.config.enable_logging;
    let app = create_router().with_state(state).layer(cors);

    if enable_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}
