#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
// self
use oci_federation::{
	client::{FederationClient, SubjectTokenFederationClient},
	error::{Error, MalformedResponse},
	retry::TokenField,
	url::Url,
};

fn build_client(server: &MockServer, subject: &str) -> SubjectTokenFederationClient {
	SubjectTokenFederationClient::new(
		common::transport(),
		"id.example.com",
		common::CLIENT_CREDENTIALS,
		subject,
		common::session_supplier(),
	)
	.expect("Subject token client should construct.")
	.with_token_endpoint(
		Url::parse(&server.url("/oauth2/v1/token")).expect("Mock token endpoint should parse."),
	)
	.with_retry_policy(common::fast_policy())
}

#[tokio::test]
async fn exchange_round_trips_and_caches_the_token() {
	let server = MockServer::start_async().await;
	let issued = common::issued_jwt(3_600);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.header("authorization", format!("Basic {}", common::CLIENT_CREDENTIALS))
				.body_includes("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Atoken-exchange")
				.body_includes("subject_token=upstream.jwt.value")
				.body_includes("subject_token_type=jwt")
				.body_includes("public_key=");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"token\":\"{issued}\"}}"));
		})
		.await;
	let client = build_client(&server, "upstream.jwt.value");
	let first = client.security_token().await.expect("Exchange should succeed.");
	let second = client.security_token().await.expect("Cached token should be returned.");

	assert_eq!(first.raw(), issued);
	assert_eq!(second.raw(), issued);
	assert_eq!(first.string_claim("sub").as_deref(), Some("test-principal"));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn access_token_field_serves_the_other_issuer_generation() {
	let server = MockServer::start_async().await;
	let issued = common::issued_jwt(3_600);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"access_token\":\"{issued}\"}}"));
		})
		.await;
	let client = build_client(&server, "upstream.jwt.value")
		.with_token_field(TokenField::AccessToken);
	let token = client.security_token().await.expect("access_token exchange should succeed.");

	assert_eq!(token.raw(), issued);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn client_rejections_fail_without_retrying() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(401).body("{\"code\":\"NotAuthenticated\"}");
		})
		.await;
	let client = build_client(&server, "upstream.jwt.value");
	let error = client.security_token().await.expect_err("401 must fail the exchange.");

	assert!(matches!(error, Error::ClientRejection { status: 401, .. }));
	assert!(!error.is_retriable());

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn server_faults_retry_to_exhaustion() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(503).body("upstream unavailable");
		})
		.await;
	let client = build_client(&server, "upstream.jwt.value");
	let error = client.security_token().await.expect_err("Persistent 503 must exhaust retries.");

	let Error::RetriesExhausted { attempts, source } = error else {
		panic!("Exhaustion should surface as RetriesExhausted, got {error:?}.");
	};

	assert_eq!(attempts, 3);
	assert!(matches!(*source, Error::ServerFault { status: 503, .. }));

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn empty_issued_tokens_are_terminal() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token\":\"\"}");
		})
		.await;
	let client = build_client(&server, "upstream.jwt.value");
	let error = client.security_token().await.expect_err("Empty token must fail the exchange.");

	assert!(matches!(
		error,
		Error::MalformedResponse(MalformedResponse::EmptyToken),
	));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn forced_refresh_bypasses_a_valid_cache() {
	let server = MockServer::start_async().await;
	let issued = common::issued_jwt(3_600);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"token\":\"{issued}\"}}"));
		})
		.await;
	let client = build_client(&server, "upstream.jwt.value");

	client.security_token().await.expect("Initial exchange should succeed.");
	client.refresh_security_token().await.expect("Forced refresh should succeed.");

	mock.assert_calls_async(2).await;
}
