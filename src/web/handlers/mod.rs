pub mod auth;
pub mod comments;
pub mod posts;
pub mod profile;
pub mod tags;

use crate::error::Error;
use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

/// Ids that are not integers can never name a row, so they are reported as
/// missing rather than malformed.
pub(crate) fn parse_id(raw: &str, missing: &str) -> Result<i64, Error> {
    raw.trim().parse().map_err(|_| Error::not_found(missing))
}
