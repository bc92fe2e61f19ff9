//! Request and response values shared by the network layer and the cache.

use bytes::Bytes;
use url::Url;

use crate::cache::hash::compute_request_key;

/// A page request: method, URL and headers.
///
/// Doubles as the cache key (method + URL) and as the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: Url,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Build a request. The method is upper-cased and the URL fragment dropped,
    /// since neither case nor fragments take part in cache matching.
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, headers: Vec::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Key under which this request's response is stored.
    pub fn cache_key(&self) -> String {
        compute_request_key(&self.method, self.url.as_str())
    }
}

/// A response as received from the network or read back from a cache.
///
/// The body is reference counted, so cloning a response to hand one copy to
/// the page and another to the cache does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_request_normalizes_method() {
        let req = Request::new(" post ", url("http://localhost:8100/"));
        assert_eq!(req.method(), "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_request_drops_fragment() {
        let req = Request::get(url("http://localhost:8100/mobile#top"));
        assert_eq!(req.url().as_str(), "http://localhost:8100/mobile");
        assert_eq!(req.cache_key(), Request::get(url("http://localhost:8100/mobile")).cache_key());
    }

    #[test]
    fn test_cache_key_depends_on_method() {
        let get = Request::get(url("http://localhost:8100/"));
        let post = Request::new("POST", url("http://localhost:8100/"));
        assert_ne!(get.cache_key(), post.cache_key());
    }

    #[test]
    fn test_headers_do_not_affect_key() {
        let plain = Request::get(url("http://localhost:8100/"));
        let with_accept = plain.clone().with_header("Accept", "text/html");
        assert_eq!(plain.cache_key(), with_accept.cache_key());
        assert_eq!(with_accept.headers().len(), 1);
    }

    #[test]
    fn test_response_header_lookup() {
        let resp = Response {
            url: url("http://localhost:8100/icon.svg"),
            status: 200,
            headers: vec![("Content-Type".into(), "image/svg+xml; charset=utf-8".into())],
            body: Bytes::from_static(b"<svg/>"),
        };
        assert!(resp.ok());
        assert_eq!(resp.content_type(), Some("image/svg+xml; charset=utf-8"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_response_ok_range() {
        let mut resp = Response { url: url("http://localhost:8100/"), status: 204, headers: vec![], body: Bytes::new() };
        assert!(resp.ok());
        resp.status = 304;
        assert!(!resp.ok());
        resp.status = 500;
        assert!(!resp.ok());
    }
}
