use api_types::layout::LayoutQuery;
use axum::{
    Json,
    extract::{Query, State},
};
use engine::LayoutConfiguration;

use crate::{
    ServerError,
    server::{JsonBody, ServerState},
};

/// Saved layout of `?user=`, or the default one stamped with that user.
pub async fn load(
    State(state): State<ServerState>,
    Query(query): Query<LayoutQuery>,
) -> Result<Json<LayoutConfiguration>, ServerError> {
    let layout = state.engine.load_layout_or_default(&query.user).await?;
    Ok(Json(layout))
}

/// The query user, when present, wins over the body's `userId`.
pub async fn save(
    State(state): State<ServerState>,
    Query(query): Query<LayoutQuery>,
    JsonBody(mut payload): JsonBody<LayoutConfiguration>,
) -> Result<Json<LayoutConfiguration>, ServerError> {
    if !query.user.trim().is_empty() {
        payload.user_id = query.user;
    }
    let saved = state.engine.save_layout(payload).await?;
    Ok(Json(saved))
}

pub async fn default_layout(State(state): State<ServerState>) -> Json<LayoutConfiguration> {
    Json(state.engine.default_layout())
}
