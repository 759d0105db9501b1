#![cfg(feature = "serde")]

use pretty_assertions::assert_eq;
use strata_mock::RequestOptions;

#[test_log::test]
fn missing_fields_fall_back_to_defaults() {
    let options: RequestOptions = serde_json::from_str(r#"{"stream": true}"#).unwrap();

    assert_eq!(options, RequestOptions::new().with_stream(true));
}

#[test_log::test]
fn options_serialize_by_field_name() {
    let value = serde_json::to_value(RequestOptions::new().with_lint(true)).unwrap();

    assert_eq!(value, serde_json::json!({ "lint": true, "stream": false }));
}
