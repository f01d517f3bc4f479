use anyhow::{Result, anyhow};

#[derive(Clone, Debug)]
pub struct ItemsConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: Option<String>,
    pub token_ttl_minutes: i64,
}

impl ItemsConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://items.db".to_string());

        let max_connections = std::env::var("MAX_CONNECTIONS")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(15);

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        // only `serve` and `token` need it, so absence is checked there
        let jwt_secret = std::env::var("JWT_SECRET_KEY")
            .ok()
            .filter(|secret| !secret.is_empty());

        let token_ttl_minutes = std::env::var("JWT_ACCESS_TOKEN_EXPIRES_MINUTES")
            .ok()
            .and_then(|val| val.parse::<i64>().ok())
            .unwrap_or(15);

        Self {
            database_url,
            max_connections,
            bind_addr,
            jwt_secret,
            token_ttl_minutes,
        }
    }

    pub fn require_jwt_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .ok_or_else(|| anyhow!("JWT_SECRET_KEY must be set to issue or verify tokens"))
    }
}
