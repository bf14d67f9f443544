//! # cfapi - Cloud Controller REST client
//!
//! A blocking client for the Cloud Controller API that speaks both the V2
//! and V3 protocol generations behind one set of types. It takes care of
//! API discovery, OAuth2 token acquisition and refresh, error envelopes,
//! and pagination.
//!
//! ## Features
//!
//! - One [`Resource`] interface over the V2 (`metadata`/`entity`) and V3
//!   (flat + `relationships`) object layouts
//! - OAuth2 password, refresh-token and client-credentials grants, with the
//!   access token refreshed before it is used once its `exp` has passed
//! - Lazy pagination following `next_url` (V2) or `pagination.next.href` (V3)
//! - Typed errors for configuration, transport, authentication and API
//!   envelope failures
//!
//! ## Basic Usage
//!
//! ```no_run
//! use cfapi::{ApiVersion, CloudController, Config};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("https://api.example.com")
//!         .with_version(ApiVersion::V3)
//!         .with_credentials("admin", "secret");
//!
//!     let mut cc = CloudController::connect(&config)?;
//!
//!     for app in cc.fetch_all("/v3/apps", &[("per_page", "100")]) {
//!         let app = app?;
//!         println!("{}", app);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Single Requests
//!
//! ```no_run
//! use cfapi::{CloudController, Config};
//! use serde_json::json;
//!
//! # fn main() -> cfapi::Result<()> {
//! let mut cc = CloudController::connect(&Config::new("https://api.example.com"))?;
//!
//! let response = cc
//!     .request("apps", &[])
//!     .set_body(&json!({"name": "web", "space_guid": "..."}))?
//!     .post()?;
//!
//! if let Some(app) = response.resource()? {
//!     println!("created {}", app.guid().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod controller;
pub mod error;
pub mod pagination;
pub mod request;
pub mod resource;
pub mod response;
pub mod session;
pub mod token;

// Re-export main types for convenience
pub use auth::Grant;
pub use client::{create_rest_client, ApiVersion, Config};
pub use controller::CloudController;
pub use error::{CfError, Result};
pub use pagination::{fetch_all, Pages, Resources};
pub use request::Request;
pub use resource::{Resource, V2Resource, V3Resource};
pub use response::Response;
pub use session::{ApiInfo, Session};
pub use token::{is_token_expired, TokenSet};

// Re-export serde_json for convenience
pub use serde_json::json;
