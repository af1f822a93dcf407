//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SITEFRAME_BIND must be a valid socket address (e.g. 0.0.0.0:3210), got {0:?}")]
    InvalidBind(String),

    #[error("SITEFRAME_TOKEN_SECRET must be set to a non-empty value")]
    MissingSecret,
}

/// Runtime configuration for a Siteframe server.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SITEFRAME_BIND` | `0.0.0.0:3210` | TCP socket address to listen on |
/// | `SITEFRAME_NAME` | `siteframe` | Server name, used in logs |
/// | `SITEFRAME_BASE_PATH` | `/api` | Prefix of every endpoint route |
/// | `SITEFRAME_TOKEN_SECRET` | (required) | HS256 secret for bearer tokens |
/// | `SITEFRAME_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `SITEFRAME_ADMIN_EMAIL` | (absent) | Admin account created at startup |
#[derive(Clone)]
pub struct ServerConfig {
    pub name: String,

    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Prefix of every endpoint route, e.g. `/api` gives `/api/site`.
    pub base_path: String,

    pub token_secret: String,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    /// Email of an admin account to create on startup if missing.
    pub admin_email: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("bind_addr", &self.bind_addr)
            .field("base_path", &self.base_path)
            .field("db_path", &self.db_path)
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::from_env`] but reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup("SITEFRAME_BIND").unwrap_or_else(|| "0.0.0.0:3210".into());
        let bind_addr = bind.parse().map_err(|_| ConfigError::InvalidBind(bind))?;

        let token_secret = lookup("SITEFRAME_TOKEN_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        Ok(Self {
            name: lookup("SITEFRAME_NAME").unwrap_or_else(|| "siteframe".into()),
            bind_addr,
            base_path: lookup("SITEFRAME_BASE_PATH").unwrap_or_else(|| "/api".into()),
            token_secret,
            db_path: lookup("SITEFRAME_DB").filter(|p| !p.is_empty()),
            admin_email: lookup("SITEFRAME_ADMIN_EMAIL").filter(|e| !e.is_empty()),
        })
    }
}
