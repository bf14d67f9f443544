use crate::client::ApiVersion;
use crate::error::{CfError, Result};
use crate::resource::Resource;
use serde_json::Value;
use std::borrow::Cow;

/// Response wraps one HTTP response from a resource endpoint and its
/// parsed JSON body. Error envelopes are only checked when resources are
/// read, so a failed response can still be inspected.
#[derive(Debug, Clone)]
pub struct Response {
    version: ApiVersion,
    status: u16,
    url: String,
    data: Value,
    text: String,
}

impl Response {
    /// Parse a raw response body. A 2xx body that is not JSON is rejected;
    /// a non-JSON error body is kept as text for the error message.
    pub fn from_body(version: ApiVersion, status: u16, url: impl Into<String>, text: String) -> Result<Self> {
        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(data) => data,
                Err(_) if !(200..300).contains(&status) => Value::Null,
                Err(e) => {
                    return Err(CfError::MalformedResponse {
                        status,
                        body: text,
                        source: e,
                    })
                }
            }
        };

        Ok(Response {
            version,
            status,
            url: url.into(),
            data,
            text,
        })
    }

    /// Build a response directly from a JSON body
    pub fn from_json(version: ApiVersion, status: u16, data: Value) -> Self {
        Response {
            version,
            status,
            url: String::new(),
            text: data.to_string(),
            data,
        }
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// URL the request was sent to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parsed body (`null` when the body was empty or not JSON)
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Raw body text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Status is in [200, 300)
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with the protocol's error envelope unless the status is 2xx
    pub fn assert_ok(&self) -> Result<()> {
        if self.is_ok() {
            return Ok(());
        }

        let detail = match self.version {
            ApiVersion::V2 => self.v2_error(),
            ApiVersion::V3 => self.v3_error(),
        }
        .unwrap_or_else(|| self.raw_description());

        Err(CfError::Response {
            message: format!("An API error occurred: HTTP {} {}.", self.status, detail),
            status: self.status,
            body: self.data.clone(),
        })
    }

    fn v2_error(&self) -> Option<String> {
        match self.data.get("error_code")? {
            Value::String(code) => Some(code.clone()),
            other => Some(other.to_string()),
        }
    }

    fn v3_error(&self) -> Option<String> {
        let first = self.data.get("errors")?.as_array()?.first()?;
        let field = |name: &str| first.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
        Some(format!("{} - {}", field("title"), field("detail")))
    }

    fn raw_description(&self) -> String {
        let body = self.text.trim();
        if body.is_empty() {
            format!("<empty response from {}>", self.url)
        } else {
            body.to_string()
        }
    }

    /// Locator of the next page, or `None` on the last page.
    ///
    /// V2 keeps it in `next_url`; V3 in `pagination.next.href`, where any
    /// level may be missing or null.
    pub fn next_url(&self) -> Option<&str> {
        match self.version {
            ApiVersion::V2 => self.data.get("next_url")?.as_str(),
            ApiVersion::V3 => self.data.get("pagination")?.get("next")?.get("href")?.as_str(),
        }
    }

    /// All resources in the body: each element of `resources`, or the body
    /// itself for singleton endpoints
    pub fn resources(&self) -> Result<Vec<Box<dyn Resource + '_>>> {
        self.assert_ok()?;
        let version = self.version;
        Ok(match self.resource_list() {
            Some(list) => list.iter().map(|r| version.resource(Cow::Borrowed(r))).collect(),
            None if self.data.is_null() => Vec::new(),
            None => vec![version.resource(Cow::Borrowed(&self.data))],
        })
    }

    /// Owned variant of [`resources`](Response::resources)
    pub fn into_resources(self) -> Result<Vec<Box<dyn Resource>>> {
        self.assert_ok()?;
        let version = self.version;
        Ok(match self.data {
            Value::Object(mut map) if map.contains_key("resources") => match map.remove("resources") {
                Some(Value::Array(list)) => list.into_iter().map(|r| version.resource(Cow::Owned(r))).collect(),
                _ => Vec::new(),
            },
            Value::Null => Vec::new(),
            data => vec![version.resource(Cow::Owned(data))],
        })
    }

    /// The single resource: the first element of `resources`, or the body
    pub fn resource(&self) -> Result<Option<Box<dyn Resource + '_>>> {
        self.assert_ok()?;
        Ok(match self.resource_list() {
            Some(list) => list.first().map(|r| self.version.resource(Cow::Borrowed(r))),
            None if self.data.is_null() => None,
            None => Some(self.version.resource(Cow::Borrowed(&self.data))),
        })
    }

    fn resource_list(&self) -> Option<&[Value]> {
        match self.data.get("resources")? {
            Value::Array(list) => Some(list.as_slice()),
            _ => Some(&[][..]),
        }
    }
}
