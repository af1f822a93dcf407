//! An endpoint: one query bound to `${base_path}/${key}`.

use std::sync::Arc;

use serde_json::Value;
use siteframe_api::Envelope;

use crate::query::{EndpointMeta, JsonQuery, Query};

/// A query exposed at a fixed route.
///
/// Built once at startup and immutable afterwards.
#[derive(Clone)]
pub struct Endpoint {
    base_path: String,
    key: String,
    query: Arc<dyn JsonQuery>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_path", &self.base_path)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Bind `query` at `${base_path}/${key}`.
    ///
    /// The query is shared, so the same instance can also be called
    /// in-process by other queries.
    pub fn new<Q: Query>(base_path: impl Into<String>, key: impl Into<String>, query: Arc<Q>) -> Self {
        Self {
            base_path: base_path.into(),
            key: key.into(),
            query,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The route path, normalised to a single leading slash and no empty
    /// segments: base `/api/` and key `site` give `/api/site`.
    pub fn path(&self) -> String {
        let segments: Vec<&str> = self
            .base_path
            .split('/')
            .chain(self.key.split('/'))
            .filter(|s| !s.is_empty())
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// Run the query and turn every outcome into an envelope.
    ///
    /// Errors are logged here with their full detail; the client only sees
    /// what [`QueryError::into_envelope`](crate::error::QueryError::into_envelope)
    /// lets through.
    pub async fn serve_request(&self, params: Value, meta: EndpointMeta) -> Envelope {
        match self.query.run_json(params, &meta).await {
            Ok(envelope) => envelope,
            Err(err) => {
                let code = err.code().to_string();
                let envelope = err.into_envelope();
                tracing::error!(
                    endpoint = %self.key,
                    code = %code,
                    detail = ?envelope.internal,
                    bearer = ?meta.bearer.as_ref().map(|u| u.user_id.as_str()),
                    "endpoint error"
                );
                envelope
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use siteframe_api::ResponseStatus;

    use crate::error::QueryError;

    struct Fails;

    #[async_trait]
    impl Query for Fails {
        type Params = Value;
        type Output = Value;

        async fn run(&self, _: Value, _: &EndpointMeta) -> Result<Envelope, QueryError> {
            Err(QueryError::Internal("connection reset".into()))
        }
    }

    #[test]
    fn paths_are_normalised() {
        let q = Arc::new(Fails);
        assert_eq!(Endpoint::new("/api", "site", q.clone()).path(), "/api/site");
        assert_eq!(Endpoint::new("/api/", "/site", q.clone()).path(), "/api/site");
        assert_eq!(Endpoint::new("", "site", q.clone()).path(), "/site");
        assert_eq!(Endpoint::new("api/v2", "site", q).path(), "/api/v2/site");
    }

    #[tokio::test]
    async fn unhandled_errors_become_generic_envelopes() {
        let endpoint = Endpoint::new("/api", "fails", Arc::new(Fails));
        let env = endpoint.serve_request(json!({}), EndpointMeta::default()).await;
        assert_eq!(env.status, ResponseStatus::Error);
        assert_eq!(env.message.as_deref(), Some(""));
        assert_eq!(env.code.as_deref(), Some("INTERNAL_ERROR"));
    }
}
