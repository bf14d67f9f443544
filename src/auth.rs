use crate::error::{CfError, Result};
use crate::session::Session;
use crate::token::TokenSet;
use reqwest::header::ACCEPT;

/// OAuth2 grant used to obtain a token set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// First login with the configured username and password
    Password { username: String, password: String },
    /// Renewal using the refresh token of the current token set
    RefreshToken(String),
    /// Client-only identity
    ClientCredentials,
}

impl Grant {
    /// Value of the `grant_type` form field
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::RefreshToken(_) => "refresh_token",
            Grant::ClientCredentials => "client_credentials",
        }
    }

    fn form<'a>(&'a self, client_id: &'a str, client_secret: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", self.grant_type()),
        ];
        match self {
            Grant::Password { username, password } => {
                form.push(("username", username.as_str()));
                form.push(("password", password.as_str()));
            }
            Grant::RefreshToken(refresh_token) => form.push(("refresh_token", refresh_token.as_str())),
            Grant::ClientCredentials => {}
        }
        form
    }
}

impl Session {
    /// Pick the grant for the next authentication.
    ///
    /// In order: password when no tokens exist yet and credentials are
    /// configured, refresh when the current tokens carry a refresh token,
    /// an error when credentials are configured but neither applies, and
    /// client credentials otherwise.
    pub fn select_grant(&self) -> Result<Grant> {
        let credentials = self.config.credentials();

        if let (None, Some((username, password))) = (&self.token, credentials) {
            return Ok(Grant::Password {
                username: username.to_string(),
                password: password.to_string(),
            });
        }

        if let Some(refresh_token) = self
            .token
            .as_ref()
            .filter(|t| t.has_refresh_token())
            .and_then(|t| t.refresh_token.clone())
        {
            return Ok(Grant::RefreshToken(refresh_token));
        }

        if credentials.is_some() {
            return Err(CfError::request("Unable to build authentication request."));
        }

        Ok(Grant::ClientCredentials)
    }

    /// Obtain a new token set from `{token_endpoint}/oauth/token` and
    /// replace the current one with it.
    pub fn authenticate(&mut self) -> Result<&TokenSet> {
        let token_endpoint = self
            .assert_info()?
            .token_endpoint
            .clone()
            .ok_or_else(|| CfError::Config("API info has no token_endpoint".to_string()))?;
        let url = format!("{}/oauth/token", token_endpoint.trim_end_matches('/'));

        let grant = self.select_grant()?;
        tracing::debug!(grant = grant.grant_type(), url = %url, "requesting access token");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&grant.form(&self.config.client_id, &self.config.client_secret))
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            tracing::warn!(
                grant = grant.grant_type(),
                status = status.as_u16(),
                "token endpoint rejected authentication"
            );
            return Err(CfError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenSet = serde_json::from_str(&body).map_err(|e| CfError::MalformedResponse {
            status: status.as_u16(),
            body: body.clone(),
            source: e,
        })?;

        Ok(&*self.token.insert(token))
    }
}
