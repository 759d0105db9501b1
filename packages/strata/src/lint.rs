//! Validating decorator for applications.
//!
//! [`lint`] wraps an [`App`] and panics as soon as either the environment it
//! is called with or the response it produces breaks the app contract. It
//! is meant for tests; a lint failure is a bug in the caller or the app.

use strata_http_models::{Headers, is_empty_body};

use crate::{App, Body, Callback, Environment};

#[must_use]
pub fn lint(app: App) -> App {
    App::new(move |env, callback| {
        check_env(&env);

        let checked = Callback::new(move |status, headers, body| {
            check_response(status, &headers, &body);
            callback.call(status, headers, body);
        });

        app.call(env, checked);
    })
}

fn check_env(env: &Environment) {
    assert!(
        env.protocol == "http" || env.protocol == "https",
        "Environment protocol must be http or https, got {:?}",
        env.protocol
    );
    assert!(
        !env.server_name.is_empty(),
        "Environment server_name must not be empty"
    );
    assert!(env.server_port != 0, "Environment server_port must not be 0");
    assert!(
        env.script_name.is_empty()
            || (env.script_name.starts_with('/') && !env.script_name.ends_with('/')),
        "Environment script_name must be empty or start (and not end) with /, got {:?}",
        env.script_name
    );
    assert!(
        env.path_info.is_empty() || env.path_info.starts_with('/'),
        "Environment path_info must be empty or start with /, got {:?}",
        env.path_info
    );
    assert!(
        !(env.script_name.is_empty() && env.path_info.is_empty()),
        "Environment script_name and path_info must not both be empty"
    );
    assert!(
        !env.query_string.starts_with('?'),
        "Environment query_string must not start with ?, got {:?}",
        env.query_string
    );
}

fn check_response(status: u16, headers: &Headers, body: &Body) {
    assert!(
        (100..=999).contains(&status),
        "Status must be a three digit number, got {status}"
    );

    for (name, value) in headers {
        assert!(
            !name.eq_ignore_ascii_case("status"),
            "Headers must not contain a Status header"
        );
        assert!(is_token(name), "Header name {name:?} is not a valid token");
        assert!(
            !value.contains(['\r', '\n']),
            "Header {name} must not contain line breaks, got {value:?}"
        );
    }

    if is_empty_body(status) {
        assert!(
            strata_http_models::header(headers, "Content-Type").is_none(),
            "Content-Type header found in {status} response, not allowed"
        );
        assert!(
            strata_http_models::header(headers, "Content-Length").is_none_or(|len| len == "0"),
            "Content-Length header found in {status} response, not allowed"
        );
        if let Body::Text(text) = body {
            assert!(
                text.is_empty(),
                "Body must be empty for {status} response, got {text:?}"
            );
        }
    }
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use strata_http_models::Method;

    use super::*;
    use crate::{EnvFields, make_env};

    fn respond_with(status: u16, headers: &[(&str, &str)], body: &'static str) -> App {
        let headers: Headers = headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        App::new(move |_env, callback| callback.call(status, headers.clone(), body))
    }

    fn run(app: &App, fields: EnvFields) -> bool {
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        lint(app.clone()).call(
            make_env(fields),
            Callback::new(move |_, _, _| flag.set(true)),
        );
        done.get()
    }

    #[test_log::test]
    fn valid_request_and_response_pass_through() {
        let app = respond_with(200, &[("Content-Type", "text/plain")], "ok");
        assert!(run(&app, EnvFields::new().with_method(Method::Post)));
    }

    #[test_log::test]
    fn no_content_with_zero_length_passes() {
        let app = respond_with(204, &[("Content-Length", "0")], "");
        assert!(run(&app, EnvFields::default()));
    }

    #[test_log::test]
    #[should_panic(expected = "query_string must not start with ?")]
    fn query_string_with_question_mark_fails() {
        run(&crate::empty(), EnvFields::new().with_query_string("?a=b"));
    }

    #[test_log::test]
    #[should_panic(expected = "path_info must be empty or start with /")]
    fn relative_path_info_fails() {
        run(&crate::empty(), EnvFields::new().with_path_info("users"));
    }

    #[test_log::test]
    #[should_panic(expected = "protocol must be http or https")]
    fn unknown_protocol_fails() {
        run(&crate::empty(), EnvFields::new().with_protocol("ftp"));
    }

    #[test_log::test]
    #[should_panic(expected = "Status must be a three digit number")]
    fn bad_status_fails() {
        run(&respond_with(42, &[], ""), EnvFields::default());
    }

    #[test_log::test]
    #[should_panic(expected = "must not contain a Status header")]
    fn status_header_fails() {
        run(&respond_with(200, &[("Status", "200")], ""), EnvFields::default());
    }

    #[test_log::test]
    #[should_panic(expected = "is not a valid token")]
    fn invalid_header_name_fails() {
        run(&respond_with(200, &[("Bad Header", "x")], ""), EnvFields::default());
    }

    #[test_log::test]
    #[should_panic(expected = "must not contain line breaks")]
    fn header_value_with_newline_fails() {
        run(
            &respond_with(200, &[("X-Test", "a\r\nb")], ""),
            EnvFields::default(),
        );
    }

    #[test_log::test]
    #[should_panic(expected = "Content-Type header found in 304 response")]
    fn content_type_on_not_modified_fails() {
        run(
            &respond_with(304, &[("Content-Type", "text/plain")], ""),
            EnvFields::default(),
        );
    }

    #[test_log::test]
    #[should_panic(expected = "Body must be empty for 204 response")]
    fn body_on_no_content_fails() {
        run(&respond_with(204, &[], "oops"), EnvFields::default());
    }
}
