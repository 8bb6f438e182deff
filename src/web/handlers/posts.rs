use crate::error::Error;
use crate::models::{CreatePost, PostFilter, PostWithRelations, UpdatePost};
use crate::services::posts;
use crate::services::slug::validate_slug;
use crate::web::error::AppResult;
use crate::web::extractors::{CurrentUser, OptionalUser};
use crate::web::handlers::{message, parse_id};
use crate::web::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::WithRejection;
use serde_json::Value;
use std::sync::Arc;

fn visible(post: Option<PostWithRelations>, viewer: &OptionalUser) -> AppResult<PostWithRelations> {
    match post {
        Some(p) if posts::is_visible_to(&p.post, viewer.id()) => Ok(p),
        _ => Err(Error::not_found("Post not found")),
    }
}

/// GET /posts?search=&tag=
pub async fn list(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(filter), _): WithRejection<Query<PostFilter>, Error>,
) -> AppResult<Json<Vec<PostWithRelations>>> {
    Ok(Json(posts::list_posts(&state.db, &filter)?))
}

/// POST /posts
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(input), _): WithRejection<Json<CreatePost>, Error>,
) -> AppResult<Response> {
    let post = posts::create_post(&state.db, user.id, input)?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// GET /posts/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    viewer: OptionalUser,
    WithRejection(Path(id), _): WithRejection<Path<String>, Error>,
) -> AppResult<Json<PostWithRelations>> {
    let id = parse_id(&id, "Post not found")?;
    let post = posts::get_post(&state.db, id)?;
    Ok(Json(visible(post, &viewer)?))
}

/// GET /posts/by-slug/:slug
pub async fn show_by_slug(
    State(state): State<Arc<AppState>>,
    viewer: OptionalUser,
    Path(slug): Path<String>,
) -> AppResult<Json<PostWithRelations>> {
    if !validate_slug(&slug) {
        return Err(Error::not_found("Post not found"));
    }
    let post = posts::get_post_by_slug(&state.db, &slug)?;
    Ok(Json(visible(post, &viewer)?))
}

/// PUT /posts/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<String>, Error>,
    WithRejection(Json(input), _): WithRejection<Json<UpdatePost>, Error>,
) -> AppResult<Json<PostWithRelations>> {
    let id = parse_id(&id, "Post not found")?;
    Ok(Json(posts::update_post(&state.db, user.id, id, input)?))
}

/// DELETE /posts/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WithRejection(Path(id), _): WithRejection<Path<String>, Error>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id, "Post not found")?;
    posts::delete_post(&state.db, user.id, id)?;
    Ok(message("Post deleted successfully"))
}
