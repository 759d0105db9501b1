#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::rc::Rc;

pub use strata_http_models::{self as models, Headers, Method, is_empty_body};
pub use strata_stream_utils::{BufferedStream, StreamError};

pub use env::{EnvFields, Environment, make_env};
pub use lint::lint;

pub mod env;
pub mod lint;

/// Response body handed to a [`Callback`].
#[derive(Debug, Clone)]
pub enum Body {
    Text(String),
    Stream(BufferedStream),
}

impl Body {
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<BufferedStream> for Body {
    fn from(value: BufferedStream) -> Self {
        Self::Stream(value)
    }
}

/// One-shot completion callback given to an application.
///
/// Calling it consumes it, so a response can be signalled at most once.
pub struct Callback(Box<dyn FnOnce(u16, Headers, Body)>);

impl Callback {
    pub fn new(f: impl FnOnce(u16, Headers, Body) + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn call(self, status: u16, headers: Headers, body: impl Into<Body>) {
        (self.0)(status, headers, body.into());
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

/// An application: receives an [`Environment`] and answers through the
/// [`Callback`], either right away or later.
#[derive(Clone)]
pub struct App(Rc<dyn Fn(Environment, Callback)>);

impl App {
    pub fn new(f: impl Fn(Environment, Callback) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, env: Environment, callback: Callback) {
        (self.0)(env, callback);
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").finish_non_exhaustive()
    }
}

/// Values that can be turned into an [`App`]. Conversion may fail, e.g. a
/// [`Builder`] that was never given an app to run.
pub trait IntoApp {
    fn into_app(self: Box<Self>) -> Option<App>;
}

impl IntoApp for App {
    fn into_app(self: Box<Self>) -> Option<App> {
        Some(*self)
    }
}

impl IntoApp for Builder {
    fn into_app(self: Box<Self>) -> Option<App> {
        self.to_app()
    }
}

pub type Middleware = Rc<dyn Fn(App) -> App>;

/// Composes middleware around an app.
#[derive(Clone, Default)]
pub struct Builder {
    app: Option<App>,
    middleware: Vec<Middleware>,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the innermost app.
    #[must_use]
    pub fn run(mut self, app: App) -> Self {
        self.app = Some(app);
        self
    }

    /// Wraps the app in `middleware`. Middleware added first ends up
    /// outermost.
    #[must_use]
    pub fn use_middleware(mut self, middleware: impl Fn(App) -> App + 'static) -> Self {
        self.middleware.push(Rc::new(middleware));
        self
    }

    /// Returns `None` if [`run`](Self::run) was never called.
    #[must_use]
    pub fn to_app(&self) -> Option<App> {
        let app = self.app.clone()?;
        Some(
            self.middleware
                .iter()
                .rev()
                .fold(app, |app, middleware| middleware(app)),
        )
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("has_app", &self.app.is_some())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// An app that answers every request with an empty `200` response.
#[must_use]
pub fn empty() -> App {
    App::new(|_env, callback| {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        headers.insert("Content-Length".to_string(), "0".to_string());
        callback.call(200, headers, "");
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;

    fn respond(app: &App) -> (u16, Headers, String) {
        let result = Rc::new(RefCell::new(None));
        let slot = result.clone();
        app.call(
            make_env(EnvFields::default()),
            Callback::new(move |status, headers, body| {
                let Body::Text(text) = body else {
                    panic!("expected a text body");
                };
                *slot.borrow_mut() = Some((status, headers, text));
            }),
        );
        result.take().expect("app did not respond")
    }

    fn tag(name: &'static str) -> impl Fn(App) -> App {
        move |inner: App| {
            App::new(move |env, callback| {
                inner.call(
                    env,
                    Callback::new(move |status, headers, body| {
                        let Body::Text(text) = body else {
                            unreachable!()
                        };
                        callback.call(status, headers, format!("{name}({text})"));
                    }),
                );
            })
        }
    }

    #[test_log::test]
    fn empty_app_answers_200_with_empty_body() {
        let (status, headers, body) = respond(&empty());
        assert_eq!(status, 200);
        assert_eq!(headers.get("Content-Length").map(String::as_str), Some("0"));
        assert_eq!(body, "");
    }

    #[test_log::test]
    fn builder_without_app_does_not_convert() {
        let builder = Builder::new().use_middleware(|app| app);
        assert!(builder.to_app().is_none());
        assert!(Box::new(builder).into_app().is_none());
    }

    #[test_log::test]
    fn first_middleware_is_outermost() {
        let app = Builder::new()
            .use_middleware(tag("outer"))
            .use_middleware(tag("inner"))
            .run(App::new(|_env, callback| {
                callback.call(200, Headers::new(), "app");
            }))
            .to_app()
            .unwrap();

        let (_, _, body) = respond(&app);
        assert_eq!(body, "outer(inner(app))");
    }

    #[test_log::test]
    fn body_conversions() {
        assert!(matches!(Body::from("x"), Body::Text(text) if text == "x"));
        assert!(Body::from(BufferedStream::new()).is_stream());
        assert!(!Body::default().is_stream());
    }
}
