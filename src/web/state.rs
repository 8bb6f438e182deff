use crate::web::security::RateLimiter;
use crate::{Config, Database};
use anyhow::Result;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub session_lifetime: chrono::Duration,
    pub signin_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let session_lifetime = config.auth.session_duration()?;
        Ok(Self {
            config,
            db,
            session_lifetime,
            signin_limiter: Arc::new(RateLimiter::default()),
        })
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.site.url.starts_with("https://")
    }
}
