//! Transport primitives for token-exchange requests.
//!
//! [`TokenTransport`] is the crate's only dependency on an HTTP stack: a
//! capability that sends one request and returns a status code, headers, and a
//! body readable as text exactly once. Federation clients stay generic over it
//! so tests and downstream services can substitute their own client, while the
//! default `reqwest` feature provides [`ReqwestTransport`].

// std
use std::ops::Deref;
// crates.io
use http::{HeaderMap, Method};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`TokenTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Outbound token-exchange request.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// Absolute request URI.
	pub uri: Url,
	/// HTTP method.
	pub method: Method,
	/// Request headers, including any signature headers added by a signer.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Vec<u8>,
}
impl TransportRequest {
	/// Creates a POST request with empty headers.
	pub fn post(uri: Url, body: Vec<u8>) -> Self {
		Self { uri, method: Method::POST, headers: HeaderMap::new(), body }
	}
}

/// Response produced by a [`TokenTransport`].
///
/// The body has already been read as text; transports must not require a second
/// read.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body decoded as text.
	pub body: String,
}

/// Abstraction over HTTP transports capable of executing token exchanges.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be
/// shared by multiple federation clients behind an `Arc` without additional
/// wrappers.
pub trait TokenTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and resolves with the full response.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one
/// place. Token requests should not follow redirects; configure any custom
/// [`ReqwestClient`] accordingly before wrapping it.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let TransportRequest { uri, method, headers, body } = request;
			let response = client
				.request(method, uri.as_str())
				.headers(headers)
				.body(body)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response.headers().to_owned();
			let body = response.text().await.map_err(TransportError::from)?;

			Ok(TransportResponse { status, headers, body })
		})
	}
}
