//! Shared helpers for the Siteframe conformance test suite.
//!
//! Provides [`spawn_server`], a function that binds a `TcpListener` on an
//! ephemeral port, wires up an in-process server backed by `MemoryStorage`,
//! and returns a [`TestServer`] holding the base URL and the server's
//! services, so tests can seed users without going through HTTP.

use std::sync::Arc;

use siteframe_api::{User, UserRole};
use siteframe_server::{build_server, MemoryStorage, ServerConfig, Services, TokenCodec};
use tokio_util::sync::CancellationToken;

pub const TOKEN_SECRET: &str = "conformance-secret";

/// A running in-process server. Dropping it shuts the server down.
pub struct TestServer {
    /// e.g. `http://127.0.0.1:51234`
    pub base_url: String,
    pub services: Services,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Full URL of an endpoint under the default `/api` base path.
    pub fn endpoint(&self, key: &str) -> String {
        format!("{}/api/{key}", self.base_url)
    }

    /// Create (or fetch) the user for `email` and issue a bearer token for it.
    pub async fn login(&self, email: &str, role: UserRole) -> (User, String) {
        let user = self
            .services
            .users
            .ensure(email, None, role)
            .await
            .expect("seed user");
        let token = self
            .services
            .tokens
            .encode(&user.email, Some(&user.user_id))
            .expect("issue token");
        (user, token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Start an ephemeral in-process server.
///
/// The server runs in a background `tokio` task bound to an OS-assigned
/// port on `127.0.0.1`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails to build.
pub async fn spawn_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let config = ServerConfig {
        name: "conformance".into(),
        bind_addr: addr,
        base_path: "/api".into(),
        token_secret: TOKEN_SECRET.into(),
        db_path: None,
        admin_email: None,
    };
    let services = Services::new(
        Arc::new(MemoryStorage::new()),
        TokenCodec::new(TOKEN_SECRET.as_bytes()),
    );

    let shutdown = CancellationToken::new();
    let server = build_server(&config, &services, shutdown.clone()).expect("build server");
    tokio::spawn(async move {
        server
            .serve_with_listener(listener)
            .await
            .expect("conformance server error");
    });

    TestServer {
        base_url: format!("http://{addr}"),
        services,
        shutdown,
    }
}
