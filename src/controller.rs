use crate::client::{ApiVersion, Config};
use crate::error::Result;
use crate::pagination::{fetch_all, Pages, Resources};
use crate::request::Request;
use crate::session::Session;

/// CloudController is the entry point: a discovered session that hands out
/// requests for its protocol version.
#[derive(Debug)]
pub struct CloudController {
    session: Session,
}

impl CloudController {
    /// Create a session from `config` and run API discovery
    pub fn connect(config: &Config) -> Result<Self> {
        let mut session = Session::new(config)?;
        session.discover()?;
        Ok(CloudController { session })
    }

    /// Wrap an already discovered session
    pub fn from_session(session: Session) -> Result<Self> {
        session.assert_info()?;
        Ok(CloudController { session })
    }

    pub fn version(&self) -> ApiVersion {
        self.session.version()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Start a request for `path` with query parameters
    pub fn request(&mut self, path: &str, query: &[(&str, &str)]) -> Request<'_> {
        Request::new(&mut self.session, path, query)
    }

    /// Every resource of the listing at `path`, fetched page by page
    pub fn fetch_all(&mut self, path: &str, query: &[(&str, &str)]) -> Resources<'_> {
        fetch_all(self.request(path, query))
    }

    /// Every page of the listing at `path`
    pub fn pages(&mut self, path: &str, query: &[(&str, &str)]) -> Pages<'_> {
        Pages::new(self.request(path, query))
    }
}
