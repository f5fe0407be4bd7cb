/*
 * Responsibility
 * - Load settings from the environment (.env supported via dotenvy)
 * - Validate them up front: a missing public key or a bad value stops startup
 */
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::services::auth::{DEFAULT_ISSUER, KeyAlgorithm, MAX_LEEWAY_SECONDS};
use crate::services::dispatch::{DispatchPolicy, RouteTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_issuer: String,
    pub auth_algorithm: KeyAlgorithm,
    pub access_jwt_public_key_pem: String,
    pub access_jwt_private_key_pem: Option<String>,
    pub access_token_leeway_seconds: u64,

    pub transport_url: String,
    pub service_routes: Vec<(String, String)>,
    pub dispatch: DispatchPolicy,

    pub http_timeout: Duration,
    pub http_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let auth_issuer = lookup("AUTH_ISSUER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        let auth_algorithm = match lookup("AUTH_ALGORITHM") {
            Some(v) => v
                .parse::<KeyAlgorithm>()
                .map_err(|_| ConfigError::Invalid("AUTH_ALGORITHM"))?,
            None => KeyAlgorithm::default(),
        };

        // PEMs are often stored on one line with literal `\n`.
        let access_jwt_public_key_pem = lookup("ACCESS_JWT_PUBLIC_KEY_PEM")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let access_jwt_private_key_pem = lookup("ACCESS_JWT_PRIVATE_KEY_PEM")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.replace("\\n", "\n"));

        let access_token_leeway_seconds = parse_or(&lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 0)?;
        if access_token_leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_LEEWAY_SECONDS"));
        }

        let transport_url =
            lookup("TRANSPORT_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let service_routes = match lookup("SERVICE_ROUTES") {
            Some(spec) => RouteTable::parse_overrides(&spec)
                .map_err(|_| ConfigError::Invalid("SERVICE_ROUTES"))?,
            None => Vec::new(),
        };

        let defaults = DispatchPolicy::default();
        let dispatch = DispatchPolicy {
            timeout: Duration::from_millis(parse_or(
                &lookup,
                "DISPATCH_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )?),
            retry_delay: Duration::from_millis(parse_or(
                &lookup,
                "DISPATCH_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
        };
        if dispatch.timeout.is_zero() {
            return Err(ConfigError::Invalid("DISPATCH_TIMEOUT_MS"));
        }

        let http_timeout = Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECONDS", 30)?);
        let http_body_limit_bytes = parse_or(&lookup, "HTTP_BODY_LIMIT_BYTES", 1024 * 1024)?;

        // Both attempts and the pause between them must fit in one HTTP request.
        if dispatch.timeout * 2 + dispatch.retry_delay >= http_timeout {
            return Err(ConfigError::Invalid("HTTP_TIMEOUT_SECONDS"));
        }

        Ok(Self {
            addr,
            app_env,
            auth_issuer,
            auth_algorithm,
            access_jwt_public_key_pem,
            access_jwt_private_key_pem,
            access_token_leeway_seconds,
            transport_url,
            service_routes,
            dispatch,
            http_timeout,
            http_body_limit_bytes,
        })
    }
}

/// Absent keys take the default; present but unparsable ones are an error.
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
