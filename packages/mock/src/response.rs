use strata::{BufferedStream, Headers};

/// Response body as observed by a test.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    /// Body given as a string, or a stream body buffered into one
    Text(String),
    /// Raw stream body, only when streaming was requested
    Stream(BufferedStream),
}

/// The reduced result of a mock request
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: ResponseBody,
}

impl MockResponse {
    #[must_use]
    pub const fn new(status: u16, headers: Headers, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a header value, ignoring the case of `name`
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        strata_http_models::header(&self.headers, name)
    }

    #[must_use]
    pub const fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The body text, or `None` for a raw stream body
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Stream(_) => None,
        }
    }

    /// The raw stream body, or `None` for a text body
    #[must_use]
    pub fn into_stream(self) -> Option<BufferedStream> {
        match self.body {
            ResponseBody::Stream(stream) => Some(stream),
            ResponseBody::Text(_) => None,
        }
    }

    /// Check if the response status is successful (2xx)
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response status is a redirection (3xx)
    #[must_use]
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Check if the response status is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response status is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Assertion helpers for [`MockResponse`]
pub trait MockResponseExt {
    /// # Panics
    ///
    /// * If the status code doesn't match
    fn assert_status(&self, expected: u16) -> &Self;

    /// # Panics
    ///
    /// * If the status is not in the 2xx range
    fn assert_success(&self) -> &Self;

    /// # Panics
    ///
    /// * If the header is missing or has a different value
    fn assert_header(&self, name: &str, expected: &str) -> &Self;

    /// Case-insensitive containment check on a header value
    ///
    /// # Panics
    ///
    /// * If the header is missing or doesn't contain `expected`
    fn assert_header_contains(&self, name: &str, expected: &str) -> &Self;

    /// # Panics
    ///
    /// * If the body is a raw stream
    /// * If the body doesn't contain the expected text
    fn assert_text_contains(&self, expected: &str) -> &Self;

    /// # Panics
    ///
    /// * If the body is a raw stream
    /// * If the body doesn't equal the expected text
    fn assert_text_equals(&self, expected: &str) -> &Self;

    /// Asserts an empty text body announced with `Content-Length: 0`
    ///
    /// # Panics
    ///
    /// * If the body is not empty text
    /// * If `Content-Length` is not `0`
    fn assert_empty_body(&self) -> &Self;
}

impl MockResponseExt for MockResponse {
    fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {expected}, got {}",
            self.status
        );
        self
    }

    fn assert_success(&self) -> &Self {
        assert!(
            self.is_success(),
            "Expected successful status (2xx), got {}",
            self.status
        );
        self
    }

    fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .header(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(
            actual, expected,
            "Expected header '{name}' to be '{expected}', got '{actual}'"
        );
        self
    }

    fn assert_header_contains(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .header(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert!(
            actual.to_lowercase().contains(&expected.to_lowercase()),
            "Expected header '{name}' to contain '{expected}', got '{actual}'"
        );
        self
    }

    fn assert_text_contains(&self, expected: &str) -> &Self {
        let text = self.text().expect("Response body is a raw stream");
        assert!(
            text.contains(expected),
            "Expected response body to contain '{expected}', got: {text}"
        );
        self
    }

    fn assert_text_equals(&self, expected: &str) -> &Self {
        let text = self.text().expect("Response body is a raw stream");
        assert_eq!(
            text, expected,
            "Expected response body to equal '{expected}', got: {text}"
        );
        self
    }

    fn assert_empty_body(&self) -> &Self {
        self.assert_text_equals("").assert_header("Content-Length", "0")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn response(status: u16, body: &str) -> MockResponse {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "text/HTML; charset=utf-8".to_string());
        MockResponse::new(status, headers, ResponseBody::Text(body.to_string()))
    }

    #[test_log::test]
    fn status_classes() {
        let classes = |status| {
            let response = response(status, "");
            [
                response.is_success(),
                response.is_redirection(),
                response.is_client_error(),
                response.is_server_error(),
            ]
        };

        assert_eq!(classes(101), [false, false, false, false]);
        assert_eq!(classes(200), [true, false, false, false]);
        assert_eq!(classes(299), [true, false, false, false]);
        assert_eq!(classes(300), [false, true, false, false]);
        assert_eq!(classes(400), [false, false, true, false]);
        assert_eq!(classes(499), [false, false, true, false]);
        assert_eq!(classes(500), [false, false, false, true]);
        assert_eq!(classes(599), [false, false, false, true]);
        assert_eq!(classes(600), [false, false, false, false]);
    }

    #[test_log::test]
    #[should_panic(expected = "Expected successful status (2xx), got 404")]
    fn assert_success_panics_on_client_error() {
        response(404, "").assert_success();
    }

    #[test_log::test]
    fn assertions_chain() {
        response(200, "Hello, World!")
            .assert_status(200)
            .assert_success()
            .assert_header("content-type", "text/HTML; charset=utf-8")
            .assert_header_contains("Content-Type", "text/html")
            .assert_text_contains("World")
            .assert_text_equals("Hello, World!");
    }

    #[test_log::test]
    #[should_panic(expected = "Expected status 200, got 500")]
    fn assert_status_panics_on_mismatch() {
        response(500, "").assert_status(200);
    }

    #[test_log::test]
    #[should_panic(expected = "Header 'X-Missing' not found")]
    fn assert_header_panics_when_missing() {
        response(200, "").assert_header("X-Missing", "1");
    }

    #[test_log::test]
    fn stream_body_has_no_text() {
        let stream = BufferedStream::new();
        let response = MockResponse::new(200, Headers::new(), ResponseBody::Stream(stream.clone()));

        assert_eq!(response.text(), None);
        assert!(response.into_stream().unwrap().ptr_eq(&stream));
    }
}
