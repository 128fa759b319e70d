//! Storefront support endpoints: the author's application and the admin
//! review surface.

use api_types::{
    settings::Language,
    support::{
        DisableRequest, SupportApply, SupportListQuery, SupportListResponse,
        SupportRequestView, ThresholdResponse, ThresholdUpdate,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::TypedHeader;
use engine::{SUPPORT_PAGE_SIZE, SupportListParams, SupportRequest};

use crate::{
    ServerError,
    server::{JsonBody, ServerState, UserIdHeader},
};

fn view(request: SupportRequest) -> SupportRequestView {
    SupportRequestView {
        id: request.id,
        storefront_id: request.storefront_id,
        user_id: request.user_id,
        username: request.username,
        display_name: request.display_name,
        software_name: request.software_name,
        store_name: request.store_name,
        welcome_message: request.welcome_message,
        status: request.status.to_string(),
        disable_reason: request.disable_reason,
        reviewed_at: request.reviewed_at,
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

/// A non-numeric `page` falls back to the first page.
fn list_params(query: SupportListQuery) -> SupportListParams {
    SupportListParams {
        page: query.page.and_then(|raw| raw.trim().parse().ok()),
        status: query.status,
        search: query.search,
        date_from: query.date_from,
        date_to: query.date_to,
        sort_order: query.sort_order,
    }
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<SupportListQuery>,
) -> Result<Json<SupportListResponse>, ServerError> {
    let page = state
        .engine
        .list_support_requests(&list_params(query))
        .await?;
    Ok(Json(SupportListResponse {
        items: page.items.into_iter().map(view).collect(),
        total: page.total,
        page: page.page,
        page_size: SUPPORT_PAGE_SIZE,
    }))
}

pub async fn set_threshold(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<ThresholdUpdate>,
) -> Result<Json<ThresholdResponse>, ServerError> {
    let threshold = state
        .engine
        .set_support_threshold_value(&payload.threshold)
        .await?;
    Ok(Json(ThresholdResponse { threshold }))
}

pub async fn get_threshold(State(state): State<ServerState>) -> Json<ThresholdResponse> {
    Json(ThresholdResponse {
        threshold: state.engine.support_threshold().await,
    })
}

pub async fn approve(
    State(state): State<ServerState>,
    Path(request_id): Path<i64>,
) -> Result<Json<SupportRequestView>, ServerError> {
    let request = state.engine.approve_support_request(request_id).await?;
    Ok(Json(view(request)))
}

pub async fn disable(
    State(state): State<ServerState>,
    Path(request_id): Path<i64>,
    JsonBody(payload): JsonBody<DisableRequest>,
) -> Result<Json<SupportRequestView>, ServerError> {
    let request = state
        .engine
        .disable_support_request(request_id, &payload.reason)
        .await?;
    Ok(Json(view(request)))
}

pub async fn reenable(
    State(state): State<ServerState>,
    Path(request_id): Path<i64>,
) -> Result<Json<SupportRequestView>, ServerError> {
    let request = state.engine.reenable_support_request(request_id).await?;
    Ok(Json(view(request)))
}

pub async fn apply(
    TypedHeader(UserIdHeader(user_id)): TypedHeader<UserIdHeader>,
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<SupportApply>,
) -> Result<(StatusCode, Json<SupportRequestView>), ServerError> {
    let request = state
        .engine
        .apply_for_support(
            user_id,
            payload.storefront_id,
            &payload.software_name,
            &payload.welcome_message,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view(request))))
}

pub async fn get_language(State(state): State<ServerState>) -> Json<Language> {
    Json(Language {
        language: state.engine.default_language().await,
    })
}

pub async fn set_language(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<Language>,
) -> Result<Json<Language>, ServerError> {
    let Some(tag) = payload.language else {
        return Err(ServerError::Generic("language is required".to_string()));
    };
    let language = state.engine.set_default_language(&tag).await?;
    Ok(Json(Language {
        language: Some(language),
    }))
}
