//! Server configuration

use credify_core::CredifyError;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Admin routes reject every request when unset
    pub admin_key: Option<String>,
    /// `*` or a comma-separated origin list
    pub cors_origins: String,
    /// Finished batch records kept for lookup; older ones are dropped
    pub batch_retention: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            admin_key: None,
            cors_origins: "*".to_string(),
            batch_retention: 100,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, CredifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredifyError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let default = Self::default();

        let bind = match get("CREDIFY_BIND") {
            Some(raw) => raw
                .parse()
                .map_err(|_| CredifyError::Config(format!("CREDIFY_BIND has invalid value '{}'", raw)))?,
            None => default.bind,
        };

        let batch_retention = match get("CREDIFY_BATCH_RETENTION") {
            Some(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                CredifyError::Config(format!(
                    "CREDIFY_BATCH_RETENTION must be a positive count, got '{}'",
                    raw
                ))
            })?,
            None => default.batch_retention,
        };

        Ok(Self {
            bind,
            admin_key: get("CREDIFY_ADMIN_KEY"),
            cors_origins: get("CREDIFY_CORS_ORIGINS").unwrap_or(default.cors_origins),
            batch_retention,
        })
    }
}
