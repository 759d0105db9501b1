//! Resolving request locations into environments.
//!
//! A [`Location`] is either a set of [`EnvFields`] or a URL string. URL
//! strings are decomposed into the protocol, server name, server port, path
//! and query fields before the environment is built; nothing else is set.

use strata::{EnvFields, Environment, make_env};
use url::Url;

use crate::Error;

/// Base used to resolve locations that carry only a path and query.
const RELATIVE_BASE: &str = "http://localhost/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Fields(EnvFields),
    Url(String),
}

impl Default for Location {
    fn default() -> Self {
        Self::Fields(EnvFields::default())
    }
}

impl From<EnvFields> for Location {
    fn from(value: EnvFields) -> Self {
        Self::Fields(value)
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::Url(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Location {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::default, Into::into)
    }
}

/// Decomposes `location` into environment fields.
///
/// Absolute URLs provide `protocol`, `server_name`, `server_port` (only when
/// an explicit, non-default port is present), `path_info` and
/// `query_string`. Relative locations like `/users?id=1` provide only the
/// path and query. Components missing from the URL are left unset.
///
/// Relative locations are resolved against `http://localhost/`, so the path
/// always starts with `/`. A scheme-less host such as `example.org/p` is not
/// recognized as a host: it becomes the path `/example.org/p`.
///
/// # Errors
///
/// * [`Error::MalformedLocation`] if `location` is not a valid URL
pub fn url_fields(location: &str) -> Result<EnvFields, Error> {
    let fields = match Url::parse(location) {
        Ok(url) => EnvFields {
            protocol: Some(url.scheme().to_string()),
            server_name: url.host_str().map(ToString::to_string),
            server_port: url.port(),
            path_info: Some(url.path().to_string()).filter(|path| !path.is_empty()),
            query_string: url.query().map(ToString::to_string),
            ..EnvFields::default()
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let url = Url::parse(RELATIVE_BASE)?.join(location)?;
            EnvFields {
                path_info: Some(url.path().to_string()),
                query_string: url.query().map(ToString::to_string),
                ..EnvFields::default()
            }
        }
        Err(e) => return Err(e.into()),
    };

    log::trace!("url_fields: {location} -> {fields:?}");

    Ok(fields)
}

/// Builds the environment for `location`.
///
/// # Errors
///
/// * [`Error::MalformedLocation`] if a URL location cannot be parsed
pub fn build_env(location: impl Into<Location>) -> Result<Environment, Error> {
    let fields = match location.into() {
        Location::Fields(fields) => fields,
        Location::Url(url) => url_fields(&url)?,
    };

    Ok(make_env(fields))
}
