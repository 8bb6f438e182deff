use crate::error::Error;
use crate::models::{CommentWithAuthor, CreateComment};
use crate::services::comments;
use crate::web::error::AppResult;
use crate::web::extractors::{CurrentUser, OptionalUser};
use crate::web::handlers::{message, parse_id};
use crate::web::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CommentsQuery {
    #[serde(rename = "postId")]
    post_id: Option<String>,
}

/// GET /comments?postId=
pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: OptionalUser,
    WithRejection(Query(query), _): WithRejection<Query<CommentsQuery>, Error>,
) -> AppResult<Json<Vec<CommentWithAuthor>>> {
    let raw = query
        .post_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::validation("postId is required"))?;
    let post_id = parse_id(raw, "Post not found")?;

    Ok(Json(comments::list_comments(&state.db, post_id, viewer.id())?))
}

/// POST /comments
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(input), _): WithRejection<Json<CreateComment>, Error>,
) -> AppResult<Response> {
    let comment = comments::create_comment(&state.db, user.id, input)?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// DELETE /comments/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<String>, Error>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, "Comment not found")?;
    comments::delete_comment(&state.db, user.id, id)?;
    Ok(message("Comment deleted"))
}
