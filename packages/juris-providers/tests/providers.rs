use reqwest::header::{AUTHORIZATION, HeaderName};
use serde_json::{Map, Value};

use juris_providers::Error;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		juris_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn merges_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("courts".to_string()));

	let headers =
		juris_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");
	let value = headers
		.get(HeaderName::from_static("x-tenant"))
		.expect("Missing default header.");

	assert_eq!(value, "courts");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = juris_providers::auth_headers("secret", &defaults)
		.expect_err("Numeric header values must be rejected.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}
