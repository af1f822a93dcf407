//! Wiring of storage, tokens, and the built-in queries into a server.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::endpoint::Endpoint;
use crate::error::ServerError;
use crate::middleware::auth::Authorizer;
use crate::queries::{InProcessSiteRemote, ManageSite, ManageUser};
use crate::query::EndpointMeta;
use crate::server::{EndpointServer, EndpointServerOptions};
use crate::storage::Storage;
use crate::token::TokenCodec;

/// Shared services, built once at startup.
///
/// Cheap to clone; every field is an `Arc`.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn Storage>,
    pub tokens: Arc<TokenCodec>,
    pub users: Arc<ManageUser>,
    pub sites: Arc<ManageSite>,
}

impl Services {
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenCodec) -> Self {
        Self {
            users: Arc::new(ManageUser::new(Arc::clone(&storage))),
            sites: Arc::new(ManageSite::new(Arc::clone(&storage))),
            tokens: Arc::new(tokens),
            storage,
        }
    }

    pub fn authorizer(&self) -> Authorizer {
        Authorizer::new(Arc::clone(&self.tokens), Arc::clone(&self.users))
    }

    /// The built-in endpoints: `{base_path}/user` and `{base_path}/site`.
    pub fn endpoints(&self, base_path: &str) -> Vec<Endpoint> {
        vec![
            Endpoint::new(base_path, "user", Arc::clone(&self.users)),
            Endpoint::new(base_path, "site", Arc::clone(&self.sites)),
        ]
    }

    /// A [`SiteRemote`](siteframe::SiteRemote) that saves through the `site`
    /// query as the given caller.
    pub fn site_remote(&self, meta: EndpointMeta) -> InProcessSiteRemote {
        InProcessSiteRemote::new(Arc::clone(&self.sites), meta)
    }
}

/// An [`EndpointServer`] serving the built-in endpoints as configured.
pub fn build_server(
    config: &ServerConfig,
    services: &Services,
    shutdown: CancellationToken,
) -> Result<EndpointServer, ServerError> {
    let options = EndpointServerOptions::new(&config.name, config.bind_addr, services.authorizer())
        .with_endpoints(services.endpoints(&config.base_path))
        .with_shutdown(shutdown);
    EndpointServer::new(options)
}
