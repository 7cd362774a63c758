use crate::{
    backend::BackendError,
    comparison::{AddOutcome, ComparisonItem, ComparisonMatrix, SimilarSearch},
    config::Config,
    eid::Eid,
    engine::{ImportReport, Insights, ScoredProduct, SmartSuggestions, StateBundle},
    errors::StoreError,
    preferences::{Preferences, PreferencesUpdate},
    product::{Product, ProductId},
    search_context::HistoryEntry,
    service::{InvalidSearch, PersonalizedResults, SearchOpts, ShopService},
    wishlist::WishlistItem,
};
use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::RwLock};

const BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct SharedState {
    service: Arc<RwLock<ShopService>>,
    config: Arc<Config>,
}

impl SharedState {
    pub fn new(service: ShopService, config: Config) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/rank", post(rank))
        .route("/api/suggestions", get(suggestions))
        .route("/api/insights", get(insights))
        .route("/api/preferences", get(get_preferences).post(update_preferences))
        .route("/api/preferences/reset", post(reset_preferences))
        .route("/api/wishlist", get(wishlist))
        .route("/api/wishlist/add", post(wishlist_add))
        .route("/api/wishlist/remove", post(wishlist_remove))
        .route("/api/wishlist/note", post(wishlist_note))
        .route("/api/comparison", get(comparison))
        .route("/api/comparison/add", post(comparison_add))
        .route("/api/comparison/remove", post(comparison_remove))
        .route("/api/comparison/matrix", get(comparison_matrix))
        .route("/api/comparison/similar", get(comparison_similar))
        .route("/api/history", get(history))
        .route("/api/history/click", post(history_click))
        .route("/api/export", get(export))
        .route("/api/import", post(import))
        .route("/api/clear", post(clear))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            tower::ServiceBuilder::new()
                .layer(
                    tower_http::trace::TraceLayer::new_for_http()
                        .make_span_with(
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                        )
                        .on_response(
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                        ),
                )
                .layer(tower_http::cors::CorsLayer::permissive()),
        )
        .with_state(Arc::new(state))
}

async fn start_app(state: SharedState) -> anyhow::Result<()> {
    let addr = state.config.listen_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::warn!("received Ctrl+C, shutting down"),
        _ = terminate => log::warn!("received terminate, shutting down"),
    }
}

pub fn start_daemon(service: ShopService, config: Config) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(SharedState::new(service, config)).await })
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<InvalidSearch>() {
            Ok(err) => return ApiError::BadRequest(err.to_string()),
            Err(err) => err,
        };
        match err.downcast::<BackendError>() {
            Ok(err) => ApiError::Backend(err),
            Err(err) => ApiError::Other(err),
        }
    }
}

#[derive(Debug)]
struct HttpError(ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Backend(_) => {
                log::error!("{self:?}");
                StatusCode::BAD_GATEWAY
            }
            ApiError::Store(_) | ApiError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

type ApiResult<T> = Result<Json<T>, HttpError>;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: Option<usize>,

    /// Keep the backend order instead of re-ranking.
    #[serde(default)]
    pub raw: bool,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> ApiResult<PersonalizedResults> {
    log::debug!("payload: {payload:?}");

    let opts = SearchOpts {
        max_results: Some(payload.max_results.unwrap_or(state.config.max_results)),
        personalize_filters: state.config.personalize_search,
        raw: payload.raw,
    };

    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        Ok(service.search(&payload.query, opts)?.into())
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankRequest {
    pub products: Vec<Product>,
}

async fn rank(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<RankRequest>,
) -> ApiResult<Vec<ScoredProduct>> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().rank(payload.products).into())
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub q: String,
}

async fn suggestions(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<SuggestionsQuery>,
) -> ApiResult<SmartSuggestions> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().smart_suggestions(&params.q).into())
    })
}

async fn insights(State(state): State<Arc<SharedState>>) -> ApiResult<Insights> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().insights().into())
    })
}

async fn get_preferences(State(state): State<Arc<SharedState>>) -> ApiResult<Preferences> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().preferences().get().clone().into())
    })
}

async fn update_preferences(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<PreferencesUpdate>,
) -> ApiResult<Preferences> {
    log::debug!("payload: {payload:?}");

    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let prefs = service.engine_mut().preferences_mut().update(payload)?;
        Ok(prefs.clone().into())
    })
}

async fn reset_preferences(State(state): State<Arc<SharedState>>) -> ApiResult<Preferences> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let prefs = service.engine_mut().preferences_mut();
        prefs.reset()?;
        Ok(prefs.get().clone().into())
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WishlistQuery {
    pub category: Option<String>,
    pub recent: Option<usize>,
}

async fn wishlist(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<WishlistQuery>,
) -> ApiResult<Vec<WishlistItem>> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        let wishlist = service.engine().wishlist();

        let items = match (params.category, params.recent) {
            (Some(category), _) => wishlist.by_category(&category),
            (None, Some(n)) => wishlist.recent(n),
            (None, None) => wishlist.list().to_vec(),
        };

        Ok(items.into())
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRequest {
    pub product: Product,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductIdRequest {
    pub id: ProductId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedResponse {
    pub changed: bool,
}

async fn wishlist_add(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ProductRequest>,
) -> ApiResult<ChangedResponse> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let changed = service.engine_mut().wishlist_mut().add(&payload.product)?;
        Ok(ChangedResponse { changed }.into())
    })
}

async fn wishlist_remove(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ProductIdRequest>,
) -> ApiResult<ChangedResponse> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let changed = service.engine_mut().wishlist_mut().remove(&payload.id)?;
        Ok(ChangedResponse { changed }.into())
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteRequest {
    pub id: ProductId,
    pub notes: String,
}

async fn wishlist_note(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteRequest>,
) -> ApiResult<ChangedResponse> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let changed = service
            .engine_mut()
            .wishlist_mut()
            .set_note(&payload.id, &payload.notes)?;

        if !changed {
            return Err(ApiError::NotFound(format!("{} is not in the wishlist", payload.id)).into());
        }
        Ok(ChangedResponse { changed }.into())
    })
}

async fn comparison(State(state): State<Arc<SharedState>>) -> ApiResult<Vec<ComparisonItem>> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().comparison().list().to_vec().into())
    })
}

async fn comparison_add(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ProductRequest>,
) -> ApiResult<AddOutcome> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        Ok(service
            .engine_mut()
            .comparison_mut()
            .add(&payload.product)
            .into())
    })
}

async fn comparison_remove(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ProductIdRequest>,
) -> ApiResult<ChangedResponse> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let changed = service.engine_mut().comparison_mut().remove(&payload.id)?;
        Ok(ChangedResponse { changed }.into())
    })
}

async fn comparison_matrix(
    State(state): State<Arc<SharedState>>,
) -> ApiResult<Option<ComparisonMatrix>> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().comparison().matrix().into())
    })
}

async fn comparison_similar(
    State(state): State<Arc<SharedState>>,
) -> ApiResult<Option<SimilarSearch>> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().comparison().suggest_similar().into())
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<HistoryQuery>,
) -> ApiResult<Vec<HistoryEntry>> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        let history = service.engine().search_context().history();
        let limit = params.limit.unwrap_or(history.len());
        Ok(history.iter().take(limit).cloned().collect::<Vec<_>>().into())
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
    pub entry_id: Eid,
    pub product_id: ProductId,
}

async fn history_click(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ClickRequest>,
) -> ApiResult<ChangedResponse> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        let changed = service
            .engine_mut()
            .search_context_mut()
            .record_click(&payload.entry_id, payload.product_id)?;

        if !changed {
            return Err(ApiError::NotFound(format!("no history entry {}", payload.entry_id)).into());
        }
        Ok(ChangedResponse { changed }.into())
    })
}

async fn export(State(state): State<Arc<SharedState>>) -> ApiResult<StateBundle> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let service = service.blocking_read();
        Ok(service.engine().export_all().into())
    })
}

/// Takes the raw exported blob so malformed data is reported in the
/// import report rather than as an extractor rejection.
async fn import(
    State(state): State<Arc<SharedState>>,
    body: String,
) -> ApiResult<ImportReport> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        Ok(service.engine_mut().import_all(&body).into())
    })
}

async fn clear(State(state): State<Arc<SharedState>>) -> ApiResult<ChangedResponse> {
    let service = state.service.clone();
    tokio::task::block_in_place(move || {
        let mut service = service.blocking_write();
        service.engine_mut().clear_all()?;
        Ok(ChangedResponse { changed: true }.into())
    })
}
