use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::handlers::api::{service_error_to_response, ApiError, ApiState};
use crate::models::{
    CartEntry, CartSnapshot, CheckoutPayload, Notification, ServiceRecord, Size,
};
use crate::services::{BrowsingSession, SessionSummary};

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_text: String,
    pub services: Vec<ServiceRecord>,
    pub rows: Vec<Vec<ServiceRecord>>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub service: ServiceRecord,
    pub available_sizes: Vec<Size>,
    pub selected_size: Option<Size>,
}

#[derive(Debug, Deserialize)]
pub struct SelectSizeRequest {
    pub size: Size,
}

#[derive(Debug, Serialize)]
pub struct SelectSizeResponse {
    pub service_id: String,
    pub selected_size: Size,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemQuery {
    pub size: Option<Size>,
}

#[derive(Debug, Serialize)]
pub struct RemoveItemResponse {
    pub removed: usize,
    pub cart: CartSnapshot,
}

async fn lookup(state: &ApiState, session_id: &str) -> Result<Arc<BrowsingSession>, ApiError> {
    state
        .registry
        .get(session_id)
        .await
        .map_err(service_error_to_response)
}

/// Open a browsing session, reusing the client's id when it sends one
#[instrument(skip(state, request))]
pub async fn open_session(
    State(state): State<ApiState>,
    request: Option<Json<OpenSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let session_id = request.and_then(|Json(body)| body.session_id);

    let session = state
        .registry
        .open(session_id)
        .await
        .map_err(service_error_to_response)?;

    info!(session_id = %session.id(), "Session ready");
    Ok((StatusCode::CREATED, Json(session.summary().await)))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = lookup(&state, &session_id).await?;
    Ok(Json(session.summary().await))
}

#[instrument(skip(state))]
pub async fn close_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .close(&session_id)
        .await
        .map_err(service_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, request), fields(text = %request.text))]
pub async fn search(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let session = lookup(&state, &session_id).await?;

    let services = session.search(&request.text).await;
    let rows = session.rows().await;

    Ok(Json(SearchResponse {
        search_text: request.text,
        total_count: services.len(),
        services,
        rows,
    }))
}

#[instrument(skip(state))]
pub async fn open_detail(
    State(state): State<ApiState>,
    Path((session_id, service_id)): Path<(String, String)>,
) -> Result<Json<DetailResponse>, ApiError> {
    let session = lookup(&state, &session_id).await?;

    let service = session
        .open_detail(&service_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(DetailResponse {
        service,
        available_sizes: Size::ALL.to_vec(),
        selected_size: None,
    }))
}

#[instrument(skip(state, request), fields(size = %request.size))]
pub async fn select_size(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(request): Json<SelectSizeRequest>,
) -> Result<Json<SelectSizeResponse>, ApiError> {
    let session = lookup(&state, &session_id).await?;

    session
        .select_size(request.size)
        .await
        .map_err(service_error_to_response)?;

    let summary = session.summary().await;
    Ok(Json(SelectSizeResponse {
        service_id: summary.selected_service_id.unwrap_or_default(),
        selected_size: request.size,
    }))
}

#[instrument(skip(state))]
pub async fn confirm_add(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<CartEntry>), ApiError> {
    let session = lookup(&state, &session_id).await?;

    match session.confirm_add().await {
        Ok(entry) => Ok((StatusCode::CREATED, Json(entry))),
        Err(err) => {
            warn!("Add to cart rejected: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_cart(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<CartSnapshot>, ApiError> {
    let session = lookup(&state, &session_id).await?;
    Ok(Json(session.cart_snapshot().await))
}

/// Remove every size of a service, or one variant when `size` is given
#[instrument(skip(state, query), fields(size = ?query.size))]
pub async fn remove_cart_item(
    State(state): State<ApiState>,
    Path((session_id, service_id)): Path<(String, String)>,
    Query(query): Query<RemoveItemQuery>,
) -> Result<Json<RemoveItemResponse>, ApiError> {
    let session = lookup(&state, &session_id).await?;

    let removed = session
        .remove(&service_id, query.size)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(RemoveItemResponse {
        removed,
        cart: session.cart_snapshot().await,
    }))
}

#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutPayload>, ApiError> {
    let session = lookup(&state, &session_id).await?;

    let payload = session
        .checkout()
        .await
        .map_err(service_error_to_response)?;

    info!(order_id = %payload.order_id, "Checkout complete");
    Ok(Json(payload))
}

/// Payloads the in-process checkout screen received for this session
#[instrument(skip(state))]
pub async fn list_checkouts(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<CheckoutPayload>>, ApiError> {
    let session = lookup(&state, &session_id).await?;

    let delivered = match &state.checkout_screen {
        Some(screen) => screen.delivered_for(session.id()).await,
        None => Vec::new(),
    };
    Ok(Json(delivered))
}

#[instrument(skip(state))]
pub async fn drain_notifications(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let session = lookup(&state, &session_id).await?;
    Ok(Json(session.drain_notifications().await))
}
