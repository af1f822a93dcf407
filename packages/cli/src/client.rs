//! HTTP client for a Siteframe server.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use siteframe::{RemoteError, SiteConfig, SiteRemote};
use siteframe_api::{Envelope, ManageSiteParams, SiteWhere};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Calls endpoints on one server, optionally as a bearer.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    base_path: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, base_path: &str, token: Option<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            base_path: base_path.trim_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint_url(&self, key: &str) -> String {
        if self.base_path.is_empty() {
            format!("{}/{}", self.base_url, key)
        } else {
            format!("{}/{}/{}", self.base_url, self.base_path, key)
        }
    }

    /// POST `params` to the endpoint and return its envelope, whatever its
    /// status.
    pub async fn call(&self, key: &str, params: &impl Serialize) -> Result<Envelope, ClientError> {
        let mut req = self.http.post(self.endpoint_url(key)).json(params);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?.json().await?)
    }

    pub async fn health(&self) -> Result<Envelope, ClientError> {
        Ok(self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .json()
            .await?)
    }
}

/// Saves sites through the server's `site` endpoint.
pub struct HttpSiteRemote {
    client: ApiClient,
}

impl HttpSiteRemote {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SiteRemote for HttpSiteRemote {
    async fn update(
        &self,
        site_id: &str,
        fields: SiteConfig,
    ) -> Result<Option<SiteConfig>, RemoteError> {
        let params = ManageSiteParams::Update {
            selector: SiteWhere::site_id(site_id),
            fields,
        };
        let envelope = self
            .client
            .call("site", &params)
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        rejected_or(envelope)?
            .decode_data::<SiteConfig>()
            .map(|env| env.data)
            .map_err(|e| RemoteError::Transport(format!("unexpected response: {e}")))
    }
}

/// Pass a success envelope through; turn anything else into a rejection.
fn rejected_or(envelope: Envelope<Value>) -> Result<Envelope<Value>, RemoteError> {
    if envelope.is_success() {
        return Ok(envelope);
    }
    Err(RemoteError::Rejected {
        code: envelope.code.unwrap_or_default(),
        message: envelope
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| envelope.status.to_string()),
    })
}
