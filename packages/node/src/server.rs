//! The endpoint server: binds endpoints to routes and serves them.
//!
//! # Routes
//!
//! | Path | Handler |
//! |------|---------|
//! | `GET /health` | fixed `{status: "success", message: "ok"}` |
//! | `{base}/{key}` and `{base}/{key}/*` | endpoint, behind [`authorize`] |
//! | paths claimed by the middleware hook | the hook's routes |
//! | anything else | 404 with a `NOT_FOUND` envelope |
//!
//! Endpoint routes accept any method. Params come from the JSON body when
//! there is one, otherwise from the query string. Responses are always
//! HTTP 200; the outcome is carried in the envelope.

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Query,
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::{any, get, MethodRouter},
    Extension, Json, Router,
};
use serde_json::{Map, Value};
use siteframe_api::{codes, Envelope};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::endpoint::Endpoint;
use crate::error::{QueryError, ServerError};
use crate::middleware::auth::{authorize, AuthContext, Authorizer};

/// Extra routes served next to the endpoints.
///
/// `paths` lists every path the hook routes. They are checked against the
/// endpoint paths and `/health` when the server is built. The hook's router is
/// only consulted for requests no endpoint matched, so an undeclared route can
/// neither replace an endpoint nor clash with one.
#[derive(Clone)]
pub struct MiddlewareHook {
    paths: Vec<String>,
    hook: Arc<dyn Fn(Router) -> Router + Send + Sync>,
}

impl MiddlewareHook {
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

pub type ServeFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

/// Serves the finished router in place of the default TCP listener. Must stop
/// when the token is cancelled.
pub type CustomServer = Box<dyn FnOnce(Router, CancellationToken) -> ServeFuture + Send>;

const HEALTH_PATH: &str = "/health";

/// Whether `a` and `b` are the same route or one lies under the other.
fn overlaps(a: &str, b: &str) -> bool {
    a == b || a.starts_with(&format!("{b}/")) || b.starts_with(&format!("{a}/"))
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

pub struct EndpointServerOptions {
    pub name: String,
    pub bind_addr: SocketAddr,
    pub endpoints: Vec<Endpoint>,
    pub authorizer: Authorizer,
    pub middleware: Option<MiddlewareHook>,
    pub custom_server: Option<CustomServer>,
    /// Cancelling this token shuts the server down.
    pub shutdown: CancellationToken,
}

impl EndpointServerOptions {
    pub fn new(name: impl Into<String>, bind_addr: SocketAddr, authorizer: Authorizer) -> Self {
        Self {
            name: name.into(),
            bind_addr,
            endpoints: Vec::new(),
            authorizer,
            middleware: None,
            custom_server: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Install a hook that adds routes (and layers over them) for `paths`.
    pub fn with_middleware<P: Into<String>>(
        mut self,
        paths: impl IntoIterator<Item = P>,
        hook: impl Fn(Router) -> Router + Send + Sync + 'static,
    ) -> Self {
        self.middleware = Some(MiddlewareHook {
            paths: paths.into_iter().map(Into::into).collect(),
            hook: Arc::new(hook),
        });
        self
    }

    pub fn with_custom_server(
        mut self,
        server: impl FnOnce(Router, CancellationToken) -> ServeFuture + Send + 'static,
    ) -> Self {
        self.custom_server = Some(Box::new(server));
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

// ---------------------------------------------------------------------------
// EndpointServer
// ---------------------------------------------------------------------------

pub struct EndpointServer {
    name: String,
    bind_addr: SocketAddr,
    endpoints: Vec<Endpoint>,
    authorizer: Authorizer,
    middleware: Option<MiddlewareHook>,
    custom_server: Option<CustomServer>,
    shutdown: CancellationToken,
}

impl EndpointServer {
    /// Validate the route set.
    ///
    /// Fails with [`ServerError::RouteCollision`] when two endpoints share a
    /// path, one endpoint's path lies under another's, an endpoint would
    /// shadow `/health`, or a path claimed by the middleware hook overlaps any
    /// of those.
    pub fn new(options: EndpointServerOptions) -> Result<Self, ServerError> {
        let mut paths: Vec<String> = vec![HEALTH_PATH.to_string()];
        for endpoint in &options.endpoints {
            let path = endpoint.path();
            if paths.iter().any(|p| overlaps(&path, p)) {
                return Err(ServerError::RouteCollision(path));
            }
            paths.push(path);
        }

        if let Some(middleware) = &options.middleware {
            let mut claimed = HashSet::new();
            for path in middleware.paths() {
                if !claimed.insert(path) || paths.iter().any(|p| overlaps(path, p)) {
                    return Err(ServerError::RouteCollision(path.clone()));
                }
            }
        }

        Ok(Self {
            name: options.name,
            bind_addr: options.bind_addr,
            endpoints: options.endpoints,
            authorizer: options.authorizer,
            middleware: options.middleware,
            custom_server: options.custom_server,
            shutdown: options.shutdown,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A handle to the token that stops this server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Build the router. Endpoints are registered in the order given; the
    /// hook's routes sit behind them and ahead of the 404 fallback.
    pub fn router(&self) -> Router {
        let mut fallback = Router::new();
        if let Some(middleware) = &self.middleware {
            fallback = (middleware.hook)(fallback);
        }
        let fallback = fallback.fallback(not_found);

        let mut router = Router::new();
        for endpoint in &self.endpoints {
            let path = endpoint.path();
            let route = endpoint_route(endpoint.clone(), self.authorizer.clone());
            router = router
                .route(&path, route.clone())
                .route(&format!("{path}/{{*rest}}"), route);
            tracing::debug!(server = %self.name, path = %path, "endpoint registered");
        }

        router
            .route(HEALTH_PATH, get(health))
            .fallback_service(fallback)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address (or hand off to the custom server) and
    /// serve until the shutdown token is cancelled.
    pub async fn serve(mut self) -> Result<(), ServerError> {
        if let Some(custom) = self.custom_server.take() {
            tracing::info!(server = %self.name, "serving through custom server");
            let router = self.router();
            custom(router, self.shutdown.clone())
                .await
                .map_err(ServerError::Serve)?;
            tracing::info!(server = %self.name, "server stopped");
            return Ok(());
        }

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind_addr,
                source,
            })?;
        self.serve_with_listener(listener).await
    }

    /// Serve on an already-bound listener until the shutdown token is
    /// cancelled. In-flight requests are drained first.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let router = self.router();
        tracing::info!(
            server = %self.name,
            addr = ?listener.local_addr().ok(),
            endpoints = self.endpoints.len(),
            "listening"
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!(server = %self.name, "server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn endpoint_route(endpoint: Endpoint, authorizer: Authorizer) -> MethodRouter {
    any(
        move |Extension(ctx): Extension<AuthContext>, uri: Uri, body: Bytes| {
            let endpoint = endpoint.clone();
            async move { serve_endpoint(&endpoint, ctx, &uri, &body).await }
        },
    )
    .layer(from_fn_with_state(authorizer, authorize))
}

async fn serve_endpoint(endpoint: &Endpoint, ctx: AuthContext, uri: &Uri, body: &[u8]) -> Json<Envelope> {
    let mut envelope = match request_params(uri, body) {
        Ok(params) => endpoint.serve_request(params, ctx.into()).await,
        Err(err) => {
            tracing::warn!(endpoint = %endpoint.key(), error = %err, "unreadable request params");
            err.into_envelope()
        }
    };

    if let Some(internal) = envelope.internal.take() {
        tracing::debug!(endpoint = %endpoint.key(), %internal, "stripped internal data");
    }
    Json(envelope)
}

/// Params from the JSON body, or from the query string when the body is empty.
fn request_params(uri: &Uri, body: &[u8]) -> Result<Value, QueryError> {
    if !body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice(body).map_err(|e| {
            QueryError::exposed(codes::INVALID_PARAMS, format!("request body is not JSON: {e}"))
        });
    }

    let Query(params) = Query::<Map<String, Value>>::try_from_uri(uri).map_err(|e| {
        QueryError::exposed(codes::INVALID_PARAMS, format!("invalid query string: {e}"))
    })?;
    Ok(Value::Object(params))
}

async fn health() -> Json<Envelope> {
    Json(Envelope::ok().with_message("ok"))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Envelope>) {
    let body = Envelope::error(format!("no route for {}", uri.path()))
        .with_code(codes::NOT_FOUND)
        .with_expose(true);
    (StatusCode::NOT_FOUND, Json(body))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
