use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

use crate::handlers::{health_check, metrics_handler, session};
use crate::models::{CatalogStatus, ServiceError, ServiceRecord};
use crate::observability::{observability_middleware, Metrics};
use crate::services::{pair_rows, CheckoutScreen, SessionRegistry};

/// Shared application state
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<SessionRegistry>,
    /// Present when checkouts are delivered to the in-process screen
    pub checkout_screen: Option<Arc<CheckoutScreen>>,
    pub metrics: Arc<Metrics>,
}

impl FromRef<ApiState> for Arc<Metrics> {
    fn from_ref(state: &ApiState) -> Self {
        Arc::clone(&state.metrics)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub services: Vec<ServiceRecord>,
    pub total_count: usize,
    pub catalog_status: CatalogStatus,
}

#[derive(Debug, Serialize)]
pub struct CatalogRowsResponse {
    pub rows: Vec<Vec<ServiceRecord>>,
    pub total_count: usize,
}

pub type ApiError = (StatusCode, Json<Value>);

/// Build the full application router with its middleware stack
pub fn create_router(state: ApiState, request_timeout: Duration) -> Router {
    let metrics = Arc::clone(&state.metrics);

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/services", get(list_services))
        .route("/api/services/rows", get(list_service_rows))
        .route("/api/services/:service_id", get(get_service))
        .route("/api/sessions", post(session::open_session))
        .route(
            "/api/sessions/:session_id",
            get(session::get_session).delete(session::close_session),
        )
        .route("/api/sessions/:session_id/search", post(session::search))
        .route(
            "/api/sessions/:session_id/detail/size",
            put(session::select_size),
        )
        .route(
            "/api/sessions/:session_id/detail/confirm",
            post(session::confirm_add),
        )
        .route(
            "/api/sessions/:session_id/detail/:service_id",
            post(session::open_detail),
        )
        .route("/api/sessions/:session_id/cart", get(session::get_cart))
        .route(
            "/api/sessions/:session_id/cart/items/:service_id",
            delete(session::remove_cart_item),
        )
        .route("/api/sessions/:session_id/checkout", post(session::checkout))
        .route(
            "/api/sessions/:session_id/checkouts",
            get(session::list_checkouts),
        )
        .route(
            "/api/sessions/:session_id/notifications",
            get(session::drain_notifications),
        )
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics.clone(), req, next)
        }))
}

/// List the catalog, optionally filtered by name
#[instrument(name = "list_services", skip(state), fields(search = %query.search))]
pub async fn list_services(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Json<CatalogResponse> {
    let catalog = state.registry.catalog();
    let catalog_status = catalog.load().await;
    let services = catalog.search(&query.search).await;

    info!("Listing {} services", services.len());

    Json(CatalogResponse {
        total_count: services.len(),
        services,
        catalog_status,
    })
}

/// The filtered catalog grouped into two-column rows
#[instrument(name = "list_service_rows", skip(state), fields(search = %query.search))]
pub async fn list_service_rows(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Json<CatalogRowsResponse> {
    let catalog = state.registry.catalog();
    catalog.load().await;
    let services = catalog.search(&query.search).await;

    Json(CatalogRowsResponse {
        total_count: services.len(),
        rows: pair_rows(&services),
    })
}

#[instrument(name = "get_service", skip(state), fields(service_id = %service_id))]
pub async fn get_service(
    State(state): State<ApiState>,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceRecord>, ApiError> {
    let catalog = state.registry.catalog();
    catalog.load().await;

    catalog.get(&service_id).await.map(Json).map_err(|err| {
        warn!("Service lookup failed: {}", err);
        service_error_to_response(err)
    })
}

/// Map a `ServiceError` onto an HTTP status and JSON error body
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::ServiceNotFound { .. } | ServiceError::SessionNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        ServiceError::MissingSize
        | ServiceError::NoServiceSelected
        | ServiceError::ValidationError { .. } => StatusCode::BAD_REQUEST,
        ServiceError::DuplicateEntry { .. } | ServiceError::SessionCheckedOut { .. } => {
            StatusCode::CONFLICT
        }
        ServiceError::Repository { .. }
        | ServiceError::Storage { .. }
        | ServiceError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Internal error: {}", err);
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
