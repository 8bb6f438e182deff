use super::handlers;
use super::state::AppState;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/signin", post(handlers::auth::signin))
        .route("/auth/signout", post(handlers::auth::signout))
        .route("/auth/me", get(handlers::auth::me))
}

pub fn content_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/posts",
            get(handlers::posts::list).post(handlers::posts::create),
        )
        .route(
            "/posts/:id",
            get(handlers::posts::show)
                .put(handlers::posts::update)
                .delete(handlers::posts::destroy),
        )
        .route("/posts/by-slug/:slug", get(handlers::posts::show_by_slug))
        .route(
            "/comments",
            get(handlers::comments::list).post(handlers::comments::create),
        )
        .route(
            "/comments/:id",
            axum::routing::delete(handlers::comments::destroy),
        )
        .route("/tags", get(handlers::tags::list))
}

pub fn profile_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", put(handlers::profile::update))
        .route("/profile/:username", get(handlers::profile::show))
}
