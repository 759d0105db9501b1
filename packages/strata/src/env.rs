//! Request environments.
//!
//! [`EnvFields`] is the loosely specified input a caller provides: every
//! standard field is optional. [`make_env`] resolves it into a complete
//! [`Environment`], filling in defaults and attaching derived metadata.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use strata_http_models::{Headers, Method};
use uuid::Uuid;

/// Partially specified request environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFields {
    pub protocol: Option<String>,
    pub server_name: Option<String>,
    pub server_port: Option<u16>,
    pub request_method: Option<Method>,
    pub script_name: Option<String>,
    pub path_info: Option<String>,
    pub query_string: Option<String>,
    pub headers: Headers,
    pub remote_addr: Option<String>,
    pub input: Option<Bytes>,
    /// Arbitrary extra fields understood by particular applications.
    pub extra: BTreeMap<String, String>,
}

impl EnvFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    #[must_use]
    pub const fn with_server_port(mut self, server_port: u16) -> Self {
        self.server_port = Some(server_port);
        self
    }

    #[must_use]
    pub const fn with_method(mut self, method: Method) -> Self {
        self.request_method = Some(method);
        self
    }

    #[must_use]
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = Some(script_name.into());
        self
    }

    #[must_use]
    pub fn with_path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = Some(path_info.into());
        self
    }

    #[must_use]
    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = Some(remote_addr.into());
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = Some(input.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Fully resolved request environment handed to an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub protocol: String,
    pub server_name: String,
    pub server_port: u16,
    pub request_method: Method,
    pub script_name: String,
    pub path_info: String,
    pub query_string: String,
    pub headers: Headers,
    pub remote_addr: String,
    pub input: Bytes,
    pub extra: BTreeMap<String, String>,
    pub request_id: Uuid,
    pub request_time: DateTime<Utc>,
}

impl Environment {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        strata_http_models::header(&self.headers, name)
    }

    #[must_use]
    pub fn extra(&self, name: &str) -> Option<&str> {
        self.extra.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_head(&self) -> bool {
        self.request_method == Method::Head
    }

    /// `script_name` followed by `path_info`.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}{}", self.script_name, self.path_info)
    }

    /// Reconstructs the request URL, omitting the port when it is the
    /// protocol's default.
    #[must_use]
    pub fn url(&self) -> String {
        let mut url = format!("{}://{}", self.protocol, self.server_name);
        if self.server_port != default_port(&self.protocol) {
            url.push(':');
            url.push_str(&self.server_port.to_string());
        }
        url.push_str(&self.full_path());
        if !self.query_string.is_empty() {
            url.push('?');
            url.push_str(&self.query_string);
        }
        url
    }
}

fn default_port(protocol: &str) -> u16 {
    if protocol.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

/// Builds an [`Environment`] from `fields`. Fields that were supplied are
/// kept as given; the rest receive defaults.
#[must_use]
pub fn make_env(fields: EnvFields) -> Environment {
    let protocol = fields.protocol.unwrap_or_else(|| "http".to_string());
    let server_port = fields
        .server_port
        .unwrap_or_else(|| default_port(&protocol));

    let env = Environment {
        server_port,
        server_name: fields
            .server_name
            .unwrap_or_else(|| "localhost".to_string()),
        request_method: fields.request_method.unwrap_or_default(),
        script_name: fields.script_name.unwrap_or_default(),
        path_info: fields.path_info.unwrap_or_else(|| "/".to_string()),
        query_string: fields.query_string.unwrap_or_default(),
        headers: fields.headers,
        remote_addr: fields.remote_addr.unwrap_or_default(),
        input: fields.input.unwrap_or_default(),
        extra: fields.extra,
        request_id: Uuid::new_v4(),
        request_time: Utc::now(),
        protocol,
    };

    log::trace!(
        "make_env: {} {} request_id={}",
        env.request_method,
        env.full_path(),
        env.request_id
    );

    env
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn empty_fields_get_defaults() {
        let env = make_env(EnvFields::default());

        assert_eq!(env.protocol, "http");
        assert_eq!(env.server_name, "localhost");
        assert_eq!(env.server_port, 80);
        assert_eq!(env.request_method, Method::Get);
        assert_eq!(env.script_name, "");
        assert_eq!(env.path_info, "/");
        assert_eq!(env.query_string, "");
        assert!(env.headers.is_empty());
        assert!(env.input.is_empty());
    }

    #[test_log::test]
    fn supplied_fields_are_kept() {
        let env = make_env(
            EnvFields::new()
                .with_protocol("https")
                .with_server_name("example.org")
                .with_server_port(8443)
                .with_method(Method::Post)
                .with_script_name("/app")
                .with_path_info("/users")
                .with_query_string("page=2")
                .with_header("Accept", "text/plain")
                .with_remote_addr("10.0.0.1")
                .with_input("a=b")
                .with_extra("session", "abc"),
        );

        assert_eq!(env.protocol, "https");
        assert_eq!(env.server_name, "example.org");
        assert_eq!(env.server_port, 8443);
        assert_eq!(env.request_method, Method::Post);
        assert_eq!(env.full_path(), "/app/users");
        assert_eq!(env.query_string, "page=2");
        assert_eq!(env.header("accept"), Some("text/plain"));
        assert_eq!(env.remote_addr, "10.0.0.1");
        assert_eq!(env.input, Bytes::from_static(b"a=b"));
        assert_eq!(env.extra("session"), Some("abc"));
    }

    #[test_log::test]
    fn https_defaults_to_port_443() {
        let env = make_env(EnvFields::new().with_protocol("https"));
        assert_eq!(env.server_port, 443);
        assert_eq!(env.url(), "https://localhost/");
    }

    #[test_log::test]
    fn url_includes_non_default_port_and_query() {
        let env = make_env(
            EnvFields::new()
                .with_server_port(3000)
                .with_path_info("/search")
                .with_query_string("q=rust"),
        );
        assert_eq!(env.url(), "http://localhost:3000/search?q=rust");
    }

    #[test_log::test]
    fn every_environment_gets_its_own_request_id() {
        let a = make_env(EnvFields::default());
        let b = make_env(EnvFields::default());
        assert_ne!(a.request_id, b.request_id);
    }
}
