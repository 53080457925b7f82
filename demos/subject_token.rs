//! Demonstrates exchanging a third-party JWT for a security token against an
//! in-process mock issuer, then reading claims off the cached token.

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oci_federation::{
	auth::RsaSessionKeySupplier,
	client::{FederationClient, SubjectTokenFederationClient},
	http::ReqwestTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let exp = time::OffsetDateTime::now_utc().unix_timestamp() + 900;
	let issued = format!(
		"{}.{}.signature",
		URL_SAFE_NO_PAD.encode(b"{\"alg\":\"RS256\",\"typ\":\"JWT\"}"),
		URL_SAFE_NO_PAD.encode(format!("{{\"sub\":\"demo-instance\",\"exp\":{exp}}}").as_bytes()),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"token\":\"{issued}\"}}"));
		})
		.await;
	let client = SubjectTokenFederationClient::new(
		Arc::new(ReqwestTransport::default()),
		"id.demo.example.com",
		"ZGVtbzpjcmVkZW50aWFscw==",
		"upstream.demo.jwt",
		Arc::new(RsaSessionKeySupplier::new()?),
	)?
	.with_token_endpoint(Url::parse(&server.url("/oauth2/v1/token"))?);
	let token = client.security_token().await?;

	println!("issued token expires at {}", token.expires_at());
	println!("subject claim: {:?}", token.string_claim("sub"));

	// The cached token serves this call; no second exchange happens.
	client.security_token().await?;
	mock.assert_calls_async(1).await;

	println!("second call served from cache");

	Ok(())
}
