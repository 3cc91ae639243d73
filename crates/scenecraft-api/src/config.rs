//! API server configuration.

use std::time::Duration;

/// API server configuration (spec §6.3 ambient HTTP options; not part of
/// the orchestration-relevant env vars, which live on `WorkerConfig`).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    pub request_timeout: Duration,
    pub environment: String,
    /// Default TTL for presigned artifact URLs, spec §4.5/§6.3 `PRESIGN_TTL_SECONDS`.
    pub presign_ttl: Duration,
    /// User IDs granted `Role::Admin` on first-seen creation. The core never
    /// verifies bearer tokens itself (spec §6), so admin status has to come
    /// from an out-of-band allowlist rather than a claim in the token.
    pub admin_user_ids: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(30),
            environment: "development".to_string(),
            presign_ttl: Duration::from_secs(3600),
            admin_user_ids: Vec::new(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(default.host),
            port: std::env::var("API_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(default.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(default.rate_limit_rps),
            request_timeout: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            environment: std::env::var("ENVIRONMENT").unwrap_or(default.environment),
            presign_ttl: std::env::var("PRESIGN_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.presign_ttl)
                .clamp(Duration::from_secs(60), Duration::from_secs(604_800)),
            admin_user_ids: std::env::var("ADMIN_USER_IDS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or(default.admin_user_ids),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
