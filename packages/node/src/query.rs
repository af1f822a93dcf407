//! The query contract.
//!
//! A [`Query`] is one business operation behind an endpoint. It takes typed
//! params plus an [`EndpointMeta`] describing the caller, and returns an
//! [`Envelope`] or a [`QueryError`]. Queries are invoked over HTTP through an
//! [`Endpoint`](crate::endpoint::Endpoint) and directly in-process by other
//! queries, which pass [`EndpointMeta::server`] or forward their own meta.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use siteframe_api::{codes, Envelope, User};

use crate::error::QueryError;
use crate::middleware::auth::AuthContext;

/// Who is calling a query.
#[derive(Debug, Clone, Default)]
pub struct EndpointMeta {
    /// The caller, when a bearer token resolved to a user.
    pub bearer: Option<User>,
    pub bearer_token: Option<String>,
    /// `true` for in-process calls that did not come through HTTP.
    pub server: bool,
}

impl EndpointMeta {
    /// Meta for a trusted in-process call.
    pub fn server() -> Self {
        Self {
            server: true,
            ..Default::default()
        }
    }

    /// Meta for an in-process call acting as `user`.
    pub fn for_user(user: User) -> Self {
        Self {
            bearer: Some(user),
            ..Default::default()
        }
    }

    /// The caller, or an exposed `UNAUTHORIZED` stop.
    pub fn require_bearer(&self) -> Result<&User, QueryError> {
        self.bearer
            .as_ref()
            .ok_or_else(|| QueryError::exposed(codes::UNAUTHORIZED, "login required"))
    }
}

impl From<AuthContext> for EndpointMeta {
    fn from(ctx: AuthContext) -> Self {
        Self {
            bearer: ctx.bearer,
            bearer_token: ctx.bearer_token,
            server: false,
        }
    }
}

/// A business operation exposed as an endpoint.
#[async_trait]
pub trait Query: Send + Sync + 'static {
    type Params: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    async fn run(
        &self,
        params: Self::Params,
        meta: &EndpointMeta,
    ) -> Result<Envelope<Self::Output>, QueryError>;
}

/// A [`Query`] with its params and output erased to JSON.
///
/// Implemented for every `Query`, so endpoints can hold any query behind one
/// trait object.
#[async_trait]
pub trait JsonQuery: Send + Sync {
    async fn run_json(&self, params: Value, meta: &EndpointMeta) -> Result<Envelope, QueryError>;
}

#[async_trait]
impl<Q: Query> JsonQuery for Q {
    async fn run_json(&self, params: Value, meta: &EndpointMeta) -> Result<Envelope, QueryError> {
        let params: Q::Params = serde_json::from_value(params)
            .map_err(|e| QueryError::exposed(codes::INVALID_PARAMS, format!("invalid params: {e}")))?;

        self.run(params, meta)
            .await?
            .into_value()
            .map_err(|e| QueryError::Internal(format!("failed to serialise response: {e}")))
    }
}
