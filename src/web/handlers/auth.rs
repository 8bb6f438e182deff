use crate::error::Error;
use crate::models::{SigninRequest, SignupRequest, User};
use crate::services::auth;
use crate::web::error::AppResult;
use crate::web::extractors::{session_token, CurrentUser, SESSION_COOKIE};
use crate::web::handlers::message;
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use time::Duration;

#[derive(Serialize)]
pub struct SessionResponse {
    token: String,
    user: User,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(state.session_lifetime.num_seconds()))
        .build()
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(input), _): WithRejection<Json<SignupRequest>, Error>,
) -> AppResult<Response> {
    let user_id = auth::create_user(&state.db, &input.email, &input.username, &input.password)?;
    let user = auth::get_user(&state.db, user_id)?
        .ok_or_else(|| Error::Internal(anyhow::anyhow!("user {} missing after signup", user_id)))?;
    let token = auth::create_session(&state.db, user.id, state.session_lifetime)?;
    tracing::info!(user_id, "Account created");

    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((StatusCode::CREATED, jar, Json(SessionResponse { token, user })).into_response())
}

/// POST /auth/signin
pub async fn signin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(input), _): WithRejection<Json<SigninRequest>, Error>,
) -> AppResult<Response> {
    let key = input.email.trim().to_lowercase();
    if !state.signin_limiter.check(&key) {
        tracing::warn!("Sign-in locked out for {}", key);
        return Err(Error::TooManyRequests);
    }

    match auth::authenticate(&state.db, &input.email, &input.password)? {
        Some(user) => {
            state.signin_limiter.clear(&key);
            let token = auth::create_session(&state.db, user.id, state.session_lifetime)?;
            let jar = jar.add(session_cookie(&state, token.clone()));
            Ok((jar, Json(SessionResponse { token, user })).into_response())
        }
        None => {
            state.signin_limiter.record_attempt(&key);
            Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid email or password" })),
            )
                .into_response())
        }
    }
}

/// POST /auth/signout
pub async fn signout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<Response> {
    if let Some(token) = session_token(&headers) {
        auth::delete_session(&state.db, &token)?;
    }

    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    Ok((jar.remove(cookie), message("Signed out")).into_response())
}

/// GET /auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
