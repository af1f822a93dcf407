//! Error types for queries and the server itself.
//!
//! A [`QueryError`] never reaches the client as-is. The endpoint turns it into
//! an error [`Envelope`] with [`QueryError::into_envelope`], blanking the
//! message unless the error was raised as exposed.

use std::net::SocketAddr;

use serde_json::{json, Value};
use siteframe_api::{codes, Envelope};

use crate::config::ConfigError;
use crate::storage::StorageError;

/// An error raised by a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A deliberate stop with a known outcome.
    ///
    /// `message` is sent to the client only when `expose` is set. `data` stays
    /// on the server as diagnostic context.
    #[error("{message}")]
    Stop {
        message: String,
        code: Option<String>,
        expose: bool,
        data: Option<Value>,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// A non-exposed stop with no code.
    pub fn stop(message: impl Into<String>) -> Self {
        QueryError::Stop {
            message: message.into(),
            code: None,
            expose: false,
            data: None,
        }
    }

    /// An exposed stop carrying `code`.
    pub fn exposed(code: &str, message: impl Into<String>) -> Self {
        QueryError::stop(message).with_code(code).expose()
    }

    /// A third-party failure. The upstream error is kept as diagnostic data.
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        QueryError::stop(format!("{context}: {err}"))
            .with_code(codes::UPSTREAM_ERROR)
            .with_data(json!({ "upstream": err.to_string() }))
    }

    pub fn with_code(self, code: &str) -> Self {
        match self {
            QueryError::Stop {
                message,
                expose,
                data,
                ..
            } => QueryError::Stop {
                message,
                code: Some(code.to_string()),
                expose,
                data,
            },
            other => other,
        }
    }

    pub fn expose(self) -> Self {
        match self {
            QueryError::Stop {
                message,
                code,
                data,
                ..
            } => QueryError::Stop {
                message,
                code,
                expose: true,
                data,
            },
            other => other,
        }
    }

    pub fn with_data(self, data: Value) -> Self {
        match self {
            QueryError::Stop {
                message,
                code,
                expose,
                ..
            } => QueryError::Stop {
                message,
                code,
                expose,
                data: Some(data),
            },
            other => other,
        }
    }

    /// Machine-readable code this error will carry on the wire.
    pub fn code(&self) -> &str {
        match self {
            QueryError::Stop { code, .. } => code.as_deref().unwrap_or(codes::INTERNAL_ERROR),
            QueryError::Storage(StorageError::NotFound) => codes::NOT_FOUND,
            QueryError::Storage(StorageError::Stale(_)) => codes::STALE_CHANGE,
            QueryError::Storage(_) | QueryError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// The error envelope sent to the client.
    ///
    /// Unexposed messages become `""`. The full message and any stop data are
    /// attached as `internal`, which is never serialised.
    pub fn into_envelope(self) -> Envelope {
        let code = self.code().to_string();
        let full = self.to_string();
        let (message, expose, data) = match self {
            QueryError::Stop {
                message,
                expose,
                data,
                ..
            } => (message, expose, data),
            QueryError::Storage(StorageError::NotFound) => ("not found".to_string(), true, None),
            QueryError::Storage(StorageError::Stale(_)) => (
                "site was changed elsewhere; reload and try again".to_string(),
                true,
                None,
            ),
            QueryError::Storage(_) | QueryError::Internal(_) => (String::new(), false, None),
        };

        let mut internal = json!({ "error": full });
        if let Some(data) = data {
            internal["data"] = data;
        }

        Envelope::error(if expose { message } else { String::new() })
            .with_code(code)
            .with_expose(expose)
            .with_internal(internal)
    }
}

/// Errors raised while building or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Two endpoints, or an endpoint and a built-in route, share a path.
    #[error("route collision on {0}")]
    RouteCollision(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("startup failed: {0}")]
    Bootstrap(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteframe_api::ResponseStatus;

    #[test]
    fn unexposed_message_is_blanked() {
        let env = QueryError::stop("db password is hunter2")
            .with_code("X")
            .into_envelope();
        assert_eq!(env.status, ResponseStatus::Error);
        assert_eq!(env.message.as_deref(), Some(""));
        assert_eq!(env.code.as_deref(), Some("X"));
        assert_eq!(env.expose, Some(false));
        assert!(env.data.is_none());
        assert_eq!(env.internal.unwrap()["error"], "db password is hunter2");
    }

    #[test]
    fn exposed_message_is_kept() {
        let env = QueryError::exposed(codes::FORBIDDEN, "not your site").into_envelope();
        assert_eq!(env.message.as_deref(), Some("not your site"));
        assert_eq!(env.expose, Some(true));
    }

    #[test]
    fn upstream_errors_keep_detail_internal() {
        let env = QueryError::upstream("payment provider", "card declined").into_envelope();
        assert_eq!(env.code.as_deref(), Some(codes::UPSTREAM_ERROR));
        assert_eq!(env.message.as_deref(), Some(""));
        let internal = env.internal.unwrap();
        assert_eq!(internal["data"]["upstream"], "card declined");
    }

    #[test]
    fn storage_errors_map_to_codes() {
        let env = QueryError::from(StorageError::Stale("c1".into())).into_envelope();
        assert_eq!(env.code.as_deref(), Some(codes::STALE_CHANGE));
        assert_eq!(env.expose, Some(true));

        let env = QueryError::from(StorageError::Internal("disk full".into())).into_envelope();
        assert_eq!(env.code.as_deref(), Some(codes::INTERNAL_ERROR));
        assert_eq!(env.message.as_deref(), Some(""));
    }

    #[test]
    fn stop_without_code_reports_internal_error() {
        let env = QueryError::stop("boom").into_envelope();
        assert_eq!(env.code.as_deref(), Some(codes::INTERNAL_ERROR));
    }
}
