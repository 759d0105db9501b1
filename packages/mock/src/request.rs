//! Sending mock requests to an app.
//!
//! [`request`] builds an environment, calls the app once and reduces its
//! response: HEAD requests and bodiless statuses get an empty body with
//! `Content-Length: 0`, and stream bodies are buffered into a single string
//! unless [`RequestOptions::stream`] is set.
//!
//! ```rust
//! use strata::{App, Headers};
//! use strata_mock::{MockResponseExt as _, RequestOptions, request};
//!
//! let app = App::new(|env, callback| {
//!     callback.call(200, Headers::new(), format!("you asked for {}", env.path_info));
//! });
//!
//! request("/users", app, &RequestOptions::default(), |result| {
//!     result.unwrap().assert_status(200).assert_text_equals("you asked for /users");
//! })
//! .unwrap();
//! ```

use std::{
    cell::RefCell,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::channel::oneshot;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strata::{App, Body, BufferedStream, Builder, Callback, Headers, IntoApp, is_empty_body};

use crate::{Error, Location, MockResponse, ResponseBody, build_env};

/// Behavioral switches for a mock request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RequestOptions {
    /// Wrap the app in [`strata::lint`]. Defaults to `false`.
    pub lint: bool,
    /// Hand stream bodies through unbuffered. Defaults to `false`.
    pub stream: bool,
}

impl RequestOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lint: false,
            stream: false,
        }
    }

    /// Reads `STRATA_MOCK_LINT` and `STRATA_MOCK_STREAM`; `1` or `true`
    /// switches the option on.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| lookup(name).is_some_and(|value| is_flag_set(&value));

        Self {
            lint: flag("STRATA_MOCK_LINT"),
            stream: flag("STRATA_MOCK_STREAM"),
        }
    }

    #[must_use]
    pub const fn with_lint(mut self, lint: bool) -> Self {
        self.lint = lint;
        self
    }

    #[must_use]
    pub const fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

fn is_flag_set(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// The app a mock request is sent to.
#[derive(Default)]
pub enum Handler {
    /// No handler given: [`strata::empty`] answers.
    #[default]
    Empty,
    /// A callable app.
    App(App),
    /// Something that must be converted first, such as a [`Builder`].
    Convertible(Box<dyn IntoApp>),
}

impl Handler {
    pub fn convertible(value: impl IntoApp + 'static) -> Self {
        Self::Convertible(Box::new(value))
    }

    /// # Errors
    ///
    /// * [`Error::InvalidHandler`] if a convertible value yields no app
    pub fn resolve(self) -> Result<App, Error> {
        match self {
            Self::Empty => Ok(strata::empty()),
            Self::App(app) => Ok(app),
            Self::Convertible(value) => value.into_app().ok_or(Error::InvalidHandler),
        }
    }
}

impl From<App> for Handler {
    fn from(value: App) -> Self {
        Self::App(value)
    }
}

impl From<Builder> for Handler {
    fn from(value: Builder) -> Self {
        Self::convertible(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Handler {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::default, Into::into)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::App(app) => f.debug_tuple("App").field(app).finish(),
            Self::Convertible(_) => f.write_str("Convertible"),
        }
    }
}

/// A completion callback that ignores the result.
pub fn discard(_result: Result<MockResponse, Error>) {}

/// Sends a mock request for `location` to `handler` and passes the reduced
/// response to `on_done` once the app has answered (and, for buffered stream
/// bodies, once the stream has ended).
///
/// `on_done` is never called if the app never answers. Panics raised by the
/// app or by stream listeners are not caught.
///
/// # Errors
///
/// * [`Error::InvalidHandler`] if `handler` cannot be converted into an app;
///   the environment is not built in that case
/// * [`Error::MalformedLocation`] if `location` is an unparseable URL
///
/// A buffered stream body that has already ended, because somebody else
/// consumed it, completes with [`Error::StreamConsumed`].
pub fn request<F>(
    location: impl Into<Location>,
    handler: impl Into<Handler>,
    options: &RequestOptions,
    on_done: F,
) -> Result<(), Error>
where
    F: FnOnce(Result<MockResponse, Error>) + 'static,
{
    let mut app = handler.into().resolve()?;

    if options.lint {
        app = strata::lint(app);
    }

    let env = build_env(location)?;
    let is_head = env.is_head();
    let raw_stream = options.stream;

    log::debug!(
        "request: {} {} request_id={}",
        env.request_method,
        env.url(),
        env.request_id
    );

    app.call(
        env,
        Callback::new(move |status, headers, body| {
            complete(status, headers, body, is_head, raw_stream, on_done);
        }),
    );

    Ok(())
}

fn complete<F>(
    status: u16,
    mut headers: Headers,
    body: Body,
    is_head: bool,
    raw_stream: bool,
    on_done: F,
) where
    F: FnOnce(Result<MockResponse, Error>) + 'static,
{
    log::trace!("complete: status={status} stream_body={}", body.is_stream());

    let body = if is_head || is_empty_body(status) {
        log::trace!("Emptying body of {status} response");
        headers.retain(|name, _| !name.eq_ignore_ascii_case("Content-Length"));
        headers.insert("Content-Length".to_string(), "0".to_string());
        Body::Text(String::new())
    } else {
        body
    };

    match body {
        Body::Text(text) => on_done(Ok(MockResponse::new(
            status,
            headers,
            ResponseBody::Text(text),
        ))),
        Body::Stream(stream) if raw_stream => on_done(Ok(MockResponse::new(
            status,
            headers,
            ResponseBody::Stream(stream),
        ))),
        Body::Stream(stream) => buffer(status, headers, &stream, on_done),
    }
}

fn buffer<F>(status: u16, headers: Headers, stream: &BufferedStream, on_done: F)
where
    F: FnOnce(Result<MockResponse, Error>) + 'static,
{
    if stream.is_ended() {
        log::debug!("Response body stream ended before it was collected");
        on_done(Err(Error::StreamConsumed));
        return;
    }

    let contents = Rc::new(RefCell::new(Vec::new()));
    let on_done = Rc::new(RefCell::new(Some(on_done)));

    {
        let contents = contents.clone();
        stream.on_data(move |chunk| contents.borrow_mut().extend_from_slice(chunk));
    }
    {
        let on_done = on_done.clone();
        stream.on_end(move || {
            if let Some(on_done) = on_done.take() {
                let text = String::from_utf8_lossy(&contents.borrow()).into_owned();
                log::trace!("Buffered stream body of {} bytes", text.len());
                on_done(Ok(MockResponse::new(
                    status,
                    headers,
                    ResponseBody::Text(text),
                )));
            }
        });
    }
    stream.on_close(move || {
        if let Some(on_done) = on_done.take() {
            log::debug!("Response body stream closed before it ended");
            on_done(Err(Error::StreamDestroyed));
        }
    });

    stream.resume();
}

/// Builder for a single mock request.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    location: Location,
    options: RequestOptions,
}

impl MockRequest {
    #[must_use]
    pub fn new(location: impl Into<Location>) -> Self {
        Self {
            location: location.into(),
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn lint(mut self, lint: bool) -> Self {
        self.options.lint = lint;
        self
    }

    #[must_use]
    pub const fn stream(mut self, stream: bool) -> Self {
        self.options.stream = stream;
        self
    }

    /// See [`request`].
    ///
    /// # Errors
    ///
    /// * If the handler cannot be resolved or the location cannot be parsed
    pub fn send<F>(self, handler: impl Into<Handler>, on_done: F) -> Result<(), Error>
    where
        F: FnOnce(Result<MockResponse, Error>) + 'static,
    {
        request(self.location, handler, &self.options, on_done)
    }

    /// Like [`send`](Self::send), but returns a future resolving to the
    /// response.
    ///
    /// # Errors
    ///
    /// * If the handler cannot be resolved or the location cannot be parsed
    pub fn response(self, handler: impl Into<Handler>) -> Result<ResponseFuture, Error> {
        let (sender, receiver) = oneshot::channel();

        self.send(handler, move |result| {
            if sender.send(result).is_err() {
                log::debug!("ResponseFuture dropped before the response arrived");
            }
        })?;

        Ok(ResponseFuture { receiver })
    }
}

/// Resolves once the app has answered. Resolves to [`Error::Canceled`] if
/// the app drops its callback, or the body stream is dropped, without
/// finishing the response.
#[derive(Debug)]
pub struct ResponseFuture {
    receiver: oneshot::Receiver<Result<MockResponse, Error>>,
}

impl Future for ResponseFuture {
    type Output = Result<MockResponse, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(Error::Canceled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
