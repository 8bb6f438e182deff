use crate::error::Error;
use crate::models::User;
use crate::services::auth;
use crate::web::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "session";

/// Session token from the `session` cookie, else from `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = CookieJar::from_headers(headers);
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Error;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let token = session_token(&parts.headers);
        Box::pin(async move {
            let token = token.ok_or(Error::Unauthorized)?;
            let user = auth::validate_session(&state.db, &token)?.ok_or(Error::Unauthorized)?;
            Ok(CurrentUser(user))
        })
    }
}

pub struct OptionalUser(pub Option<User>);

impl OptionalUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = Error;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let token = session_token(&parts.headers);
        Box::pin(async move {
            let user = match token {
                Some(t) => auth::validate_session(&state.db, &t)?,
                None => None,
            };
            Ok(OptionalUser(user))
        })
    }
}
