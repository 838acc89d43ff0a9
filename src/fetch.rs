//! HTTP GET behind a narrow capability trait, so the GitHub client and the
//! badge extractor can be driven by canned responses in tests.

use std::time::Duration;

use tracing::debug;

use crate::error::{HarvestError, Result};

/// A GET request with its headers and time bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Request {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Performs requests. Any HTTP status is a [`Response`]; only transport
/// faults (DNS, connect, timeout, unreadable body) are errors.
pub trait Fetcher {
    fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Real network access through `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &Request) -> Result<Response> {
        let mut call = ureq::get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let resp = match call.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(e) => return Err(HarvestError::Http(format!("{}: {e}", request.url))),
        };
        let status = resp.status();
        let body = resp
            .into_string()
            .map_err(|e| HarvestError::Http(format!("{}: failed to read body: {e}", request.url)))?;
        debug!(url = %request.url, status, bytes = body.len(), "fetched");
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::get("https://example.com", Duration::from_secs(3))
            .header("User-Agent", "covharvest")
            .header("Accept", "text/plain");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.headers[0], ("User-Agent".to_string(), "covharvest".to_string()));
        assert_eq!(req.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_response_ok() {
        let ok = Response { status: 200, body: String::new() };
        let missing = Response { status: 404, body: String::new() };
        assert!(ok.is_ok());
        assert!(!missing.is_ok());
    }
}
