//! Bearer-credential signing for token-exchange requests.
//!
//! No cryptographic signature is computed over the request itself;
//! authentication rests on possession of the client credential and the subject
//! token carried in the form body.

// crates.io
use http::{
	HeaderValue,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use url::form_urlencoded;
// self
use crate::{_prelude::*, cert, error::SigningError, http::TransportRequest};

/// OAuth2 grant identifying a token exchange.
pub const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
/// Token type requested from the issuer.
pub const REQUESTED_TOKEN_TYPE: &str = "urn:oci:token-type:oci-upst";
/// Type of the presented subject token.
pub const SUBJECT_TOKEN_TYPE: &str = "jwt";

/// Attaches a static `Authorization: Basic` header and the form content type to
/// exchange requests.
#[derive(Clone)]
pub struct BearerRequestSigner {
	basic_credentials: String,
}
impl BearerRequestSigner {
	/// Wraps already-base64 client credentials resolved by the configuration
	/// layer.
	pub fn new(client_credentials: impl Into<String>) -> Self {
		Self { basic_credentials: client_credentials.into() }
	}

	/// Builds the form-encoded token-exchange body for one refresh cycle.
	pub fn exchange_body(public_key_pem: &str, subject_token: &str) -> Vec<u8> {
		form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", TOKEN_EXCHANGE_GRANT)
			.append_pair("requested_token_type", REQUESTED_TOKEN_TYPE)
			.append_pair("public_key", &cert::sanitize_pem(public_key_pem))
			.append_pair("subject_token", subject_token)
			.append_pair("subject_token_type", SUBJECT_TOKEN_TYPE)
			.finish()
			.into_bytes()
	}

	/// Adds the authorization and content-type headers.
	pub fn sign(&self, request: &mut TransportRequest) -> Result<(), SigningError> {
		let authorization = format!("Basic {}", self.basic_credentials);

		request.headers.insert(
			AUTHORIZATION,
			HeaderValue::from_str(&authorization)
				.map_err(|_| SigningError::HeaderValue { header: "authorization".into() })?,
		);
		request.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("application/x-www-form-urlencoded"),
		);

		Ok(())
	}
}
impl Debug for BearerRequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerRequestSigner").field("basic_credentials", &"<redacted>").finish()
	}
}
