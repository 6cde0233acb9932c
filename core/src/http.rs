//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests to the record backend and its responses are plain data. Services
//! build `HttpRequest` values and parse `HttpResponse` values; the host
//! executes the actual round trip with whatever HTTP stack it already has.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL including any query string. Built by the
/// `build_*` methods of [`RecordClient`](crate::RecordClient) and the
/// services layered on it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the host after executing an `HttpRequest`, then handed to
/// the matching `parse_*` method.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A response with no headers, mostly useful to hosts and tests.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_are_uppercase() {
        let names: Vec<_> = [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete]
            .iter()
            .map(HttpMethod::to_string)
            .collect();
        assert_eq!(names, ["GET", "POST", "PUT", "DELETE"]);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "http://localhost/x".to_string(),
            headers: vec![("X-Project-Id".to_string(), "p1".to_string())],
            body: None,
        };
        assert_eq!(req.header("x-project-id"), Some("p1"));
        assert_eq!(req.header("x-public-key"), None);
    }
}
