//! Fetch Primitives
//!
//! Request/response types, fetch events, and the network collaborator used
//! by the offline cache worker.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

/// Fetch event ID counter
static NEXT_FETCH_ID: AtomicU64 = AtomicU64::new(1);

/// Fetch event ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchEventId(u64);

impl FetchEventId {
    /// Create a new ID
    pub fn new() -> Self {
        Self(NEXT_FETCH_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for FetchEventId {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Default for RequestMethod {
    fn default() -> Self {
        Self::Get
    }
}

impl RequestMethod {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

/// An intercepted request
#[derive(Debug, Clone)]
pub struct Request {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: RequestMethod,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body (if any)
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Create a new GET request
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Set the method
    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }
}

/// Response type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Ordinary response
    Default,
    /// Network error response (what a page sees for a failed load)
    Error,
}

impl Default for ResponseType {
    fn default() -> Self {
        Self::Default
    }
}

/// A network or cached response
#[derive(Debug, Clone)]
pub struct Response {
    /// Response type
    pub response_type: ResponseType,
    /// URL the response was fetched from
    pub url: String,
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Option<Vec<u8>>,
}

impl Response {
    /// Create a new response
    pub fn new(status: u16) -> Self {
        Self {
            response_type: ResponseType::Default,
            url: String::new(),
            status,
            status_text: status_text_for(status).to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Create a network error response
    pub fn error() -> Self {
        Self {
            response_type: ResponseType::Error,
            url: String::new(),
            status: 0,
            status_text: String::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Check if the status is in the 2xx range
    pub fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Check if this is a network error response
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }
}

/// Get status text for status code
fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Failure of the network fetch primitive itself.
///
/// This is the rejection case: the request never produced an HTTP response.
/// Error statuses are not a `NetworkError`; they arrive as ordinary
/// `Response`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Host unreachable or connection refused
    Unreachable,
    /// Connection dropped mid-request
    ConnectionLost,
    /// Request timed out at the network layer
    Timeout,
}

/// Network fetch collaborator.
///
/// The worker is a pure consumer of this interface; the hosting runtime
/// supplies the implementation.
pub trait NetworkFetch: Send + Sync {
    /// Perform a network fetch.
    ///
    /// `Ok` means the request resolved to an HTTP response, whatever the
    /// status code. `Err` means the request failed outright.
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

impl<'a, T: NetworkFetch + ?Sized> NetworkFetch for &'a T {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request)
    }
}

/// A fetch event delivered to the worker.
///
/// An event left un-responded proceeds on the default (uncontrolled)
/// network path.
#[derive(Debug)]
pub struct FetchEvent {
    /// Event ID
    id: FetchEventId,
    /// The intercepted request
    request: Request,
    /// Whether respond_with was called
    responded: bool,
    /// Response (if respond_with was called)
    response: Option<Response>,
}

impl FetchEvent {
    /// Create a new fetch event
    pub fn new(request: Request) -> Self {
        Self {
            id: FetchEventId::new(),
            request,
            responded: false,
            response: None,
        }
    }

    /// Get the event ID
    pub fn id(&self) -> FetchEventId {
        self.id
    }

    /// Get the request
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Check if respond_with was called
    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Respond with a response. The first call wins.
    pub fn respond_with(&mut self, response: Response) {
        if !self.responded {
            self.responded = true;
            self.response = Some(response);
        }
    }

    /// Take the response out of the event
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
