//! Bearer token authorization.
//!
//! [`authorize`] runs in front of every endpoint route. It resolves the
//! `Authorization: Bearer <token>` header into an [`AuthContext`] and inserts
//! it into the request extensions:
//!
//! - no header, a non-`Bearer` scheme, or an empty token: anonymous context;
//! - a token that fails to decode, or a failed user lookup: the request is
//!   answered immediately with a `TOKEN_ERROR` envelope at HTTP 200;
//! - a valid token for an unknown email: anonymous context, token kept.
//!
//! `favicon.ico` requests skip all of this.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use siteframe_api::{codes, Envelope, User};

use crate::error::QueryError;
use crate::query::EndpointMeta;
use crate::queries::ManageUser;
use crate::token::{TokenCodec, TokenError};

// ---------------------------------------------------------------------------
// AuthContext
// ---------------------------------------------------------------------------

/// The caller as resolved from the request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub bearer: Option<User>,
    pub bearer_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Auth errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is not visible ASCII")]
    Header,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("user lookup failed: {0}")]
    Lookup(#[from] QueryError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body: Envelope = Envelope::error("authorization error").with_code(codes::TOKEN_ERROR);
        (StatusCode::OK, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Authorizer
// ---------------------------------------------------------------------------

/// Resolves bearer tokens to users. State of the [`authorize`] middleware.
#[derive(Clone)]
pub struct Authorizer {
    tokens: Arc<TokenCodec>,
    users: Arc<ManageUser>,
}

impl Authorizer {
    pub fn new(tokens: Arc<TokenCodec>, users: Arc<ManageUser>) -> Self {
        Self { tokens, users }
    }

    pub async fn resolve(&self, header: Option<&HeaderValue>) -> Result<AuthContext, AuthError> {
        let Some(header) = header else {
            return Ok(AuthContext::default());
        };
        let header = header.to_str().map_err(|_| AuthError::Header)?;

        let Some(token) = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return Ok(AuthContext::default());
        };

        let claims = self.tokens.decode(token)?;
        let bearer = self
            .users
            .get_private(&claims.email, &EndpointMeta::server())
            .await?;

        Ok(AuthContext {
            bearer,
            bearer_token: Some(token.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub async fn authorize(State(auth): State<Authorizer>, mut req: Request, next: Next) -> Response {
    if req.uri().path().ends_with("/favicon.ico") {
        req.extensions_mut().insert(AuthContext::default());
        return next.run(req).await;
    }

    let header = req.headers().get(AUTHORIZATION).cloned();
    match auth.resolve(header.as_ref()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            tracing::error!(path = %req.uri().path(), error = %e, "authorization failed");
            e.into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
