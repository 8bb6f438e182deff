use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
    /// Public base URL. Session cookies are marked `Secure` when it is https.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// `<n>d` or `<n>h`.
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime: default_session_lifetime(),
        }
    }
}

impl AuthConfig {
    pub fn session_duration(&self) -> Result<chrono::Duration> {
        parse_lifetime(&self.session_lifetime)
    }
}

fn parse_lifetime(value: &str) -> Result<chrono::Duration> {
    let value = value.trim();
    let Some((unit_start, _)) = value.char_indices().last() else {
        anyhow::bail!("Session lifetime cannot be empty");
    };
    let (amount, unit) = value.split_at(unit_start);
    let amount: i64 = amount
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid session lifetime '{}'", value))?;
    if amount <= 0 {
        anyhow::bail!("Session lifetime must be positive, got '{}'", value);
    }
    let lifetime = match unit {
        "d" => chrono::Duration::try_days(amount),
        "h" => chrono::Duration::try_hours(amount),
        _ => anyhow::bail!("Session lifetime '{}' must end in 'd' or 'h'", value),
    };
    match lifetime {
        Some(lifetime) if lifetime <= max_session_lifetime() => Ok(lifetime),
        _ => anyhow::bail!(
            "Session lifetime '{}' exceeds the maximum of {} days",
            value,
            MAX_SESSION_DAYS
        ),
    }
}

pub const MAX_SESSION_DAYS: i64 = 365;

fn max_session_lifetime() -> chrono::Duration {
    chrono::Duration::days(MAX_SESSION_DAYS)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}

fn default_session_lifetime() -> String {
    "7d".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run 'lity init' first?",
                path.display(),
                e
            )
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        self.auth.session_duration()?;
        Ok(())
    }

    /// The configuration `lity init` writes for a new site.
    pub fn default_for(name: &str) -> Self {
        Self {
            site: SiteConfig {
                title: name.to_string(),
                url: "http://localhost:3000".to_string(),
            },
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: "./data/lity.db".to_string(),
                pool_size: default_pool_size(),
            },
            auth: AuthConfig::default(),
        }
    }
}
