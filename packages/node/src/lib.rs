//! Public surface for the `siteframe-server` crate.
//!
//! Exposes the endpoint server, the query contract, and the built-in queries
//! so that external crates (e.g. the conformance test suite) can run an
//! in-process server without spawning a subprocess.

pub mod app;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod middleware;
pub mod queries;
pub mod query;
pub mod server;
pub mod storage;
pub mod token;

pub use app::{build_server, Services};
pub use config::{ConfigError, ServerConfig};
pub use endpoint::Endpoint;
pub use error::{QueryError, ServerError};
pub use middleware::auth::{AuthContext, Authorizer};
pub use query::{EndpointMeta, Query};
pub use server::{EndpointServer, EndpointServerOptions};
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage, StorageError};
pub use token::TokenCodec;
