use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

/// Depth of a request that has not been placed in the crawl tree yet.
pub const UNSET_DEPTH: u32 = u32::MAX;

/// Fields produced by a response parser. Keys are unique, order is irrelevant.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Outbound request payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        }
    }

    pub fn parse(url: &str) -> crate::Result<Self> {
        Ok(Self::get(Url::parse(url)?))
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }
}

/// Inbound response payload.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// URL the response was fetched from, used to resolve relative links.
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    id: u64,
    request: HttpRequest,
    depth: u32,
}

impl DownloadRequest {
    pub fn new(id: u64, request: HttpRequest, depth: u32) -> Self {
        Self { id, request, depth }
    }

    /// A request found on a page; the page parser assigns its depth.
    pub fn derived(request: HttpRequest) -> Self {
        Self::new(0, request, UNSET_DEPTH)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn url(&self) -> &Url {
        &self.request.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_valid(&self) -> bool {
        self.depth != UNSET_DEPTH
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DownloadResponse {
    id: u64,
    response: HttpResponse,
    depth: u32,
}

impl DownloadResponse {
    pub fn new(id: u64, response: HttpResponse, depth: u32) -> Self {
        Self {
            id,
            response,
            depth,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// A value produced by parsing: either more work or a finished item.
#[derive(Debug, Clone)]
pub enum BaseData {
    Request(DownloadRequest),
    Item(Item),
}

impl BaseData {
    pub fn kind(&self) -> &'static str {
        match self {
            BaseData::Request(_) => "request",
            BaseData::Item(_) => "item",
        }
    }
}

impl From<DownloadRequest> for BaseData {
    fn from(request: DownloadRequest) -> Self {
        BaseData::Request(request)
    }
}

impl From<Item> for BaseData {
    fn from(item: Item) -> Self {
        BaseData::Item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_request_is_invalid_until_depth_is_set() {
        let req = DownloadRequest::derived(HttpRequest::parse("http://example.test/a").unwrap());
        assert!(!req.is_valid());

        let req = req.with_depth(2);
        assert!(req.is_valid());
        assert_eq!(req.depth(), 2);
    }

    #[test]
    fn http_request_exposes_host() {
        let req = HttpRequest::parse("http://blog.example.test:8080/x").unwrap();
        assert_eq!(req.host(), Some("blog.example.test"));
        assert_eq!(req.method, Method::GET);
    }
}
