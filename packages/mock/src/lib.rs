#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Mock requests for strata apps.
//!
//! Sends a synthetic request straight to an app, without a server or a
//! socket, and reduces whatever the app answers into a [`MockResponse`].
//!
//! ```rust
//! use futures::executor::block_on;
//! use strata::{App, Headers};
//! use strata_mock::{MockRequest, MockResponseExt as _};
//!
//! let app = App::new(|_env, callback| {
//!     let mut headers = Headers::new();
//!     headers.insert("Content-Type".to_string(), "text/plain".to_string());
//!     callback.call(200, headers, "hello");
//! });
//!
//! let response = block_on(MockRequest::new("/greet").response(app).unwrap()).unwrap();
//!
//! response
//!     .assert_status(200)
//!     .assert_header("content-type", "text/plain")
//!     .assert_text_equals("hello");
//! ```

pub mod env;
mod error;
pub mod request;
pub mod response;
pub mod stream;

pub use env::{Location, build_env, url_fields};
pub use error::Error;
pub use request::{Handler, MockRequest, RequestOptions, ResponseFuture, discard, request};
pub use response::{MockResponse, MockResponseExt, ResponseBody};
pub use stream::{Captured, FlushingStream, capture};
