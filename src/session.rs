use crate::client::{create_rest_client, ApiVersion, Config};
use crate::error::{CfError, Result};
use crate::token::TokenSet;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// API info document served by `GET {base_url}/v2/info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    /// UAA base URL; tokens are issued at `{token_endpoint}/oauth/token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Every other field of the document
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Session holds everything a request needs: where the API lives, which
/// protocol it speaks, who we are, and the current tokens.
///
/// A session has a single owner. Requests borrow it mutably so that a
/// token refresh is never observed half-way.
pub struct Session {
    pub(crate) config: Config,
    pub(crate) base_url: Url,
    pub(crate) client: Client,
    pub(crate) info: Option<ApiInfo>,
    pub(crate) token: Option<TokenSet>,
}

impl Session {
    /// Create a new session. No network traffic happens until
    /// [`discover`](Session::discover) is called.
    pub fn new(config: &Config) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(CfError::Config("base URL is required".to_string()));
        }
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| CfError::Config(format!("invalid base URL {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CfError::Config(format!("invalid base URL {:?}", config.base_url)));
        }

        Ok(Session {
            client: create_rest_client(config)?,
            config: config.clone(),
            base_url,
            info: None,
            token: None,
        })
    }

    /// Fetch the API info document. Must succeed before any authenticated
    /// request; failures are not retried.
    pub fn discover(&mut self) -> Result<&ApiInfo> {
        let url = format!("{}/v2/info", self.config.base_url.trim().trim_end_matches('/'));
        tracing::debug!(url = %url, "discovering API endpoints");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| CfError::Discovery {
                message: format!("Error configuring: {}", e),
                status: None,
                source: Some(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "API discovery rejected");
            return Err(CfError::Discovery {
                message: format!("Error configuring {}: {}", status.as_u16(), body),
                status: Some(status.as_u16()),
                source: None,
            });
        }

        let info: ApiInfo = response.json().map_err(|e| CfError::Discovery {
            message: format!("Error configuring: invalid info document: {}", e),
            status: Some(status.as_u16()),
            source: Some(e),
        })?;

        tracing::debug!(
            token_endpoint = info.token_endpoint.as_deref().unwrap_or("-"),
            api_version = info.api_version.as_deref().unwrap_or("-"),
            "API discovered"
        );
        Ok(&*self.info.insert(info))
    }

    /// Fail unless discovery has completed
    pub fn assert_info(&self) -> Result<&ApiInfo> {
        self.info
            .as_ref()
            .ok_or_else(|| CfError::Config("Config info is required.".to_string()))
    }

    /// Fail unless discovery and authentication have both completed
    pub fn assert_auth(&self) -> Result<&TokenSet> {
        self.assert_info()?;
        self.token
            .as_ref()
            .ok_or_else(|| CfError::Config("Config auth is required.".to_string()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn version(&self) -> ApiVersion {
        self.config.version
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Discovered API metadata, if any
    pub fn info(&self) -> Option<&ApiInfo> {
        self.info.as_ref()
    }

    /// Current tokens, if authenticated
    pub fn token(&self) -> Option<&TokenSet> {
        self.token.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("info", &self.info)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}
