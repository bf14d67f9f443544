use crate::error::{CfError, Result};
use crate::response::Response;
use crate::session::Session;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;

/// Leading scheme+host and API version prefix of a path or page locator
static PATH_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://[^/]+)?/(v\d+/)?").expect("valid path prefix pattern"));

/// Request is a builder for one logical API call.
///
/// The target URL is always rooted at the session's base URL and version,
/// whatever host or version prefix the caller (or a page locator) supplies.
pub struct Request<'s> {
    session: &'s mut Session,
    url: Url,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
}

impl<'s> Request<'s> {
    /// Create a request for `path` with the given query parameters
    pub fn new(session: &'s mut Session, path: &str, query: &[(&str, &str)]) -> Self {
        let url = session.base_url.clone();
        let mut request = Request {
            session,
            url,
            body: None,
            headers: HeaderMap::new(),
        };
        request.set_target(path, query);
        request
    }

    /// Point the request at `path`, re-rooted as
    /// `{base_url}/{version}/{path}?{query}`.
    ///
    /// Any scheme+host and `/vN/` prefix in `path` is dropped, so full page
    /// locators returned by the server resolve against the configured host.
    /// A query string in `path` is kept and `query` is appended to it.
    pub fn set_target(&mut self, path: &str, query: &[(&str, &str)]) -> &mut Self {
        let path = PATH_PREFIX.replace(path, "");
        let (path, locator_query) = match path.split_once('?') {
            Some((path, q)) => (path, Some(q)),
            None => (&*path, None),
        };

        let mut url = self.session.base_url.clone();
        url.set_path(&format!("{}/{}", self.session.version(), path));
        url.set_query(locator_query.filter(|q| !q.is_empty()));
        url.set_fragment(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        self.url = url;
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn set_body<T: Serialize + ?Sized>(&mut self, body: &T) -> Result<&mut Self> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self.set_raw_body(bytes))
    }

    /// Use pre-serialized JSON as the request body
    pub fn set_raw_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = Some(body.into());
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Set an extra request header
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<&mut Self> {
        let value = HeaderValue::from_str(value).map_err(|e| CfError::Request {
            message: format!("invalid value for header {}: {}", name, e),
            url: Some(self.url.to_string()),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Current target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    /// Send the request with `method`.
    ///
    /// Authenticates first when there is no token or it has expired. Any
    /// HTTP status is returned as a [`Response`]; only transport failures
    /// are errors here.
    pub fn send(&mut self, method: Method) -> Result<Response> {
        self.session.assert_info()?;

        let now = Utc::now().timestamp();
        let needs_auth = match self.session.token() {
            None => true,
            Some(token) => token.is_expired(now)?,
        };
        if needs_auth {
            self.session.authenticate()?;
        }
        let token = self.session.assert_auth()?;

        let bearer = HeaderValue::from_str(&format!("bearer {}", token.access_token)).map_err(|e| CfError::Request {
            message: format!("access token is not a valid header value: {}", e),
            url: Some(self.url.to_string()),
        })?;

        let mut headers = self.headers.clone();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut request = self
            .session
            .client
            .request(method.clone(), self.url.clone())
            .headers(headers);
        if let Some(ref body) = self.body {
            request = request.body(body.clone());
        }

        let start = std::time::Instant::now();
        let http_response = request.send()?;
        let status = http_response.status().as_u16();
        let text = http_response.text()?;

        tracing::debug!(
            method = %method,
            url = %self.url,
            status,
            elapsed = ?start.elapsed(),
            "cloud controller request"
        );

        Response::from_body(self.session.version(), status, self.url.as_str(), text)
    }

    pub fn get(&mut self) -> Result<Response> {
        self.send(Method::GET)
    }

    pub fn post(&mut self) -> Result<Response> {
        self.send(Method::POST)
    }

    pub fn put(&mut self) -> Result<Response> {
        self.send(Method::PUT)
    }

    pub fn delete(&mut self) -> Result<Response> {
        self.send(Method::DELETE)
    }
}

impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}
