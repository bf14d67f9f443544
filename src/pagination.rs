//! Lazy iteration over paginated listings.
//!
//! Both protocol generations return one page per request together with a
//! locator for the next page (`next_url` in V2, `pagination.next.href` in
//! V3). [`Pages`] follows those locators one request at a time; [`fetch_all`]
//! flattens the pages into resources.
//!
//! Iteration stops after the last page or the first error. Nothing is
//! prefetched, so dropping the iterator early costs no extra requests. A
//! server whose locators form a cycle is followed forever.

use crate::error::Result;
use crate::request::Request;
use crate::resource::Resource;
use crate::response::Response;
use std::collections::VecDeque;

/// Iterator over the pages of a listing, starting at the request's target
pub struct Pages<'s> {
    request: Request<'s>,
    next: Option<String>,
    done: bool,
}

impl<'s> Pages<'s> {
    pub fn new(request: Request<'s>) -> Self {
        Pages {
            request,
            next: None,
            done: false,
        }
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Response>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(locator) = self.next.take() {
            self.request.set_target(&locator, &[]);
        }
        tracing::debug!(url = %self.request.url(), "fetching page");

        let response = match self.request.get() {
            Ok(response) => response,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        match response.next_url() {
            Some(locator) if response.is_ok() => self.next = Some(locator.to_string()),
            _ => self.done = true,
        }

        Some(Ok(response))
    }
}

/// Iterator over every resource of a listing, in server order
pub struct Resources<'s> {
    pages: Pages<'s>,
    buffer: VecDeque<Box<dyn Resource>>,
    failed: bool,
}

impl Iterator for Resources<'_> {
    type Item = Result<Box<dyn Resource>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(resource) = self.buffer.pop_front() {
                return Some(Ok(resource));
            }
            if self.failed {
                return None;
            }

            match self.pages.next()?.and_then(Response::into_resources) {
                Ok(resources) => self.buffer.extend(resources),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Follow the listing at the request's target, yielding resources lazily
pub fn fetch_all(request: Request<'_>) -> Resources<'_> {
    Resources {
        pages: Pages::new(request),
        buffer: VecDeque::new(),
        failed: false,
    }
}
