use crate::services::tags::{self, TAG_LIST_LIMIT};
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// GET /tags
pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(tags::list_tag_names(&state.db, TAG_LIST_LIMIT)?))
}
