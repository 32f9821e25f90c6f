use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, HeaderValue, Method, StatusCode}, routing::{get, post}, Json, Router};
use casefind_core::{Corpus, Document, DocumentId, Engine, EngineConfig, PreparedCorpus, QueryFields, SearchError, SearchOptions};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
    pub min_similarity: Option<f64>,
}

/// Body of `POST /search`: either `query`, or document-style fields
/// (`title`, `description`, ...) at the top level. `query` wins when both are present.
#[derive(Deserialize, Default)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    pub top_n: Option<usize>,
    pub min_similarity: Option<f64>,
    #[serde(flatten)]
    pub fields: QueryFields,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    /// Documents with any overlap, before truncation and threshold.
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub document_id: DocumentId,
    pub similarity: f64,
    pub rank: usize,
    pub title: Option<String>,
}

pub struct AppOptions {
    pub corpus_path: PathBuf,
    pub config: EngineConfig,
    pub admin_token: Option<String>,
    /// Comma-separated origins allowed by CORS; any origin when unset or empty.
    pub cors_origins: Option<String>,
}

impl AppOptions {
    /// Reads `ADMIN_TOKEN` (corpus reload is disabled without it) and `CORS_ALLOW_ORIGIN`.
    pub fn from_env(corpus_path: impl Into<PathBuf>, config: EngineConfig) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            config,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            cors_origins: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub corpus: Arc<RwLock<Arc<PreparedCorpus>>>,
    pub corpus_path: PathBuf,
    pub admin_token: Option<String>,
}

impl AppState {
    /// Current corpus. Held for the whole request so a reload never splits one.
    fn snapshot(&self) -> Arc<PreparedCorpus> {
        self.corpus.read().clone()
    }
}

type ApiError = (StatusCode, String);

pub fn build_app(options: AppOptions) -> Result<Router> {
    // Load and tokenize the corpus once at startup
    let engine = Engine::new(options.config)?;
    let corpus = Corpus::load(&options.corpus_path)?;
    let prepared = engine.prepare(corpus);
    let app_state = AppState {
        engine: Arc::new(engine),
        corpus: Arc::new(RwLock::new(Arc::new(prepared))),
        corpus_path: options.corpus_path,
        admin_token: options.admin_token,
    };

    let cors = cors_layer(options.cors_origins.as_deref());

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_get).post(search_post))
        .route("/doc/:id", get(doc_handler))
        .route("/corpus/reload", post(reload_corpus))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Search and reload are the only cross-origin calls browsers need to make.
fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .map(|list| list.split(',').filter_map(|o| o.trim().parse().ok()).collect())
        .unwrap_or_default();
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

pub async fn search_get(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    blocking(move || run_search(&state, params.q, params.k, params.min_similarity)).await
}

pub async fn search_post(State(state): State<AppState>, Json(req): Json<SearchRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let query = match req.query {
        Some(q) => q,
        None => req.fields.text(&state.engine.config().fields),
    };
    blocking(move || run_search(&state, query, req.top_n, req.min_similarity)).await
}

/// Full-corpus scans run on the blocking pool so they never stall the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("worker task failed: {e}")))?
}

fn run_search(state: &AppState, query: String, top_n: Option<usize>, min_similarity: Option<f64>) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let config = state.engine.config();
    let top_n = top_n.unwrap_or(config.default_top_n);
    if top_n > config.max_top_n {
        return Err(bad_request(SearchError::TopNTooLarge { requested: top_n, max: config.max_top_n }));
    }
    let options = SearchOptions { top_n, min_similarity: min_similarity.unwrap_or(config.min_similarity) };

    let snapshot = state.snapshot();
    let ranking = state.engine.search_with(&query, &snapshot, &options).map_err(bad_request)?;
    let corpus = snapshot.corpus();
    let results = ranking
        .results
        .into_iter()
        .map(|r| {
            let title = corpus.get(&r.document_id).and_then(|d| d.field("title")).map(str::to_string);
            SearchHit { document_id: r.document_id, similarity: r.similarity, rank: r.rank, title }
        })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), total_hits: ranking.total_hits, results }))
}

fn bad_request(err: SearchError) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

pub async fn doc_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Document>, ApiError> {
    let snapshot = state.snapshot();
    match snapshot.corpus().get_str(&id) {
        Some(doc) => Ok(Json(doc.clone())),
        None => Err((StatusCode::NOT_FOUND, format!("document {id} not found"))),
    }
}

// --- Admin endpoints ---
const ADMIN_HEADER: &str = "x-admin-token";

async fn reload_corpus(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(state.admin_token.as_deref(), &headers)?;
    let documents = blocking(move || {
        // On failure the previous corpus stays in place
        let corpus = Corpus::load(&state.corpus_path).map_err(|e| {
            tracing::warn!(error = %e, path = %state.corpus_path.display(), "corpus reload failed");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;
        let prepared = state.engine.prepare(corpus);
        let documents = prepared.corpus().len();
        *state.corpus.write() = Arc::new(prepared);
        Ok(documents)
    })
    .await?;
    tracing::info!(documents, "corpus reloaded");
    Ok(Json(serde_json::json!({ "documents": documents })))
}

fn require_admin(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Err((StatusCode::UNAUTHORIZED, "corpus reload is disabled: ADMIN_TOKEN not set".into()));
    };
    match headers.get(ADMIN_HEADER) {
        Some(given) if given.as_bytes() == expected.as_bytes() => Ok(()),
        Some(_) => Err((StatusCode::UNAUTHORIZED, "wrong X-ADMIN-TOKEN".into())),
        None => Err((StatusCode::UNAUTHORIZED, "missing X-ADMIN-TOKEN".into())),
    }
}
