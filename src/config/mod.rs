use std::env;

use chrono::Duration;

use crate::security::GateSecret;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::{apply_security_headers, hsts_enabled_from_env};

/// Default credential lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

pub struct Config {
    pub database_url: String,
    pub signing_secret: GateSecret,
    pub token_ttl: Duration,
}

impl Config {
    /// Load from the environment. The signing secret has no default: a
    /// process that cannot sign or verify credentials must not come up.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/gatepass".to_string());

        let signing_secret = GateSecret::new(
            env::var("GATE_SIGNING_SECRET")
                .expect("GATE_SIGNING_SECRET must be set")
                .into_bytes(),
        );

        let token_ttl = env::var("GATE_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Duration::seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_TTL_SECS));

        Self {
            database_url,
            signing_secret,
            token_ttl,
        }
    }
}
