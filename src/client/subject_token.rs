//! Federation client exchanging a third-party JWT for security tokens.

// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_CLOCK_SKEW, SecurityToken, SessionKeySupplier, SubjectCredential},
	client::{ClientFuture, FederationClient, exchange::BearerExchange},
	http::TokenTransport,
	obs::ExchangeKind,
	retry::{RetryPolicy, TokenField},
	sign::BearerRequestSigner,
};

/// Exchanges a third-party JWT, static or dynamically provided, for security
/// tokens via bearer-credential exchange.
///
/// Concurrent refreshes are not deduplicated; callers that expect stampedes
/// should use
/// [`WorkloadIdentityFederationClient`](crate::client::WorkloadIdentityFederationClient)
/// instead.
#[derive(Debug)]
pub struct SubjectTokenFederationClient {
	core: BearerExchange,
}
impl SubjectTokenFederationClient {
	/// Creates a client against `https://<domain_host>/oauth2/v1/token` with
	/// default retry, token field, and clock skew settings.
	///
	/// `client_credentials` is the pre-encoded basic-authentication value
	/// attached to every exchange request.
	pub fn new(
		transport: Arc<dyn TokenTransport>,
		domain_host: &str,
		client_credentials: impl Into<String>,
		subject: impl Into<SubjectCredential>,
		session_keys: Arc<dyn SessionKeySupplier>,
	) -> Result<Self> {
		Ok(Self {
			core: BearerExchange::new(
				transport,
				BearerExchange::token_endpoint(domain_host)?,
				subject.into(),
				BearerRequestSigner::new(client_credentials),
				session_keys,
				RetryPolicy::default(),
				TokenField::default(),
				DEFAULT_CLOCK_SKEW,
			),
		})
	}

	/// Replaces the token endpoint entirely, bypassing the
	/// `https://<domain_host>/oauth2/v1/token` convention. Intended for
	/// gateways and test servers that front the issuer on a non-default URL.
	pub fn with_token_endpoint(mut self, token_url: Url) -> Self {
		*self.core.token_url_mut() = token_url;

		self
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		*self.core.policy_mut() = policy;

		self
	}

	/// Replaces the success-body token field selection.
	pub fn with_token_field(mut self, field: TokenField) -> Self {
		*self.core.token_field_mut() = field;

		self
	}

	/// Replaces the clock-skew safety margin applied to cache validity.
	pub fn with_clock_skew(mut self, skew: Duration) -> Self {
		*self.core.skew_mut() = skew;

		self
	}
}
impl FederationClient for SubjectTokenFederationClient {
	fn security_token(&self) -> ClientFuture<'_, SecurityToken> {
		Box::pin(async move {
			if let Some(token) = self.core.cached() {
				return Ok(token);
			}

			self.core.refresh(ExchangeKind::SubjectToken).await
		})
	}

	fn refresh_security_token(&self) -> ClientFuture<'_, SecurityToken> {
		Box::pin(self.core.refresh(ExchangeKind::SubjectToken))
	}

	fn string_claim<'a>(&'a self, key: &'a str) -> ClientFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.security_token().await?.string_claim(key)) })
	}
}
