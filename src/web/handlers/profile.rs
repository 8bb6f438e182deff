use crate::error::Error;
use crate::models::{Profile, UpdateProfile, User};
use crate::services::profile;
use crate::web::error::AppResult;
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use std::sync::Arc;

/// PUT /profile
pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(input), _): WithRejection<Json<UpdateProfile>, Error>,
) -> AppResult<Json<User>> {
    Ok(Json(profile::update_profile(&state.db, user.id, input)?))
}

/// GET /profile/:username
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> AppResult<Json<Profile>> {
    profile::get_public_profile(&state.db, &username)?
        .map(Json)
        .ok_or_else(|| Error::not_found("User not found"))
}
