// self
use crate::{
	_prelude::*,
	auth::{SecurityToken, SessionKeySupplier, SubjectCredential},
	error::ConfigError,
	http::{TokenTransport, TransportRequest},
	obs::{self, ExchangeKind, ExchangeOutcome, ExchangeSpan},
	retry::{self, RetryPolicy, TokenField},
	sign::BearerRequestSigner,
};

// Bearer-credential exchange core shared by the subject-token and
// workload-identity clients. One refresh cycle rotates the session key pair,
// resolves the subject credential once, and replays the resulting request
// through the retry loop; the token cache is only replaced on success.
pub(crate) struct BearerExchange {
	transport: Arc<dyn TokenTransport>,
	token_url: Url,
	subject: SubjectCredential,
	signer: BearerRequestSigner,
	session_keys: Arc<dyn SessionKeySupplier>,
	policy: RetryPolicy,
	token_field: TokenField,
	skew: Duration,
	token: RwLock<SecurityToken>,
}
impl BearerExchange {
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn new(
		transport: Arc<dyn TokenTransport>,
		token_url: Url,
		subject: SubjectCredential,
		signer: BearerRequestSigner,
		session_keys: Arc<dyn SessionKeySupplier>,
		policy: RetryPolicy,
		token_field: TokenField,
		skew: Duration,
	) -> Self {
		Self {
			transport,
			token_url,
			subject,
			signer,
			session_keys,
			policy,
			token_field,
			skew,
			token: RwLock::new(SecurityToken::placeholder()),
		}
	}

	// `https://<domain_host>/oauth2/v1/token`; the host may carry a port.
	pub(crate) fn token_endpoint(domain_host: &str) -> Result<Url> {
		Url::parse(&format!("https://{domain_host}/oauth2/v1/token"))
			.map_err(|source| ConfigError::InvalidEndpoint { source }.into())
	}

	// Snapshot with its own cache slot; used when a configuration change must
	// rebuild a core that is still referenced by an abandoned refresh cycle.
	pub(crate) fn duplicate(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			token_url: self.token_url.clone(),
			subject: self.subject.clone(),
			signer: self.signer.clone(),
			session_keys: self.session_keys.clone(),
			policy: self.policy,
			token_field: self.token_field,
			skew: self.skew,
			token: RwLock::new(self.token.read().clone()),
		}
	}

	pub(crate) fn token_url_mut(&mut self) -> &mut Url {
		&mut self.token_url
	}

	pub(crate) fn policy_mut(&mut self) -> &mut RetryPolicy {
		&mut self.policy
	}

	pub(crate) fn token_field_mut(&mut self) -> &mut TokenField {
		&mut self.token_field
	}

	pub(crate) fn skew_mut(&mut self) -> &mut Duration {
		&mut self.skew
	}

	pub(crate) fn cached(&self) -> Option<SecurityToken> {
		let token = self.token.read();

		token.is_valid(self.skew).then(|| token.clone())
	}

	pub(crate) async fn refresh(&self, kind: ExchangeKind) -> Result<SecurityToken> {
		let span = ExchangeSpan::new(kind, "refresh");

		obs::record_exchange_outcome(kind, ExchangeOutcome::Attempt);

		let result = span.instrument(self.refresh_inner()).await;

		obs::record_exchange_outcome(
			kind,
			if result.is_ok() { ExchangeOutcome::Success } else { ExchangeOutcome::Failure },
		);

		result
	}

	async fn refresh_inner(&self) -> Result<SecurityToken> {
		self.session_keys.refresh_keys().await?;

		let key_pair = self.session_keys.key_pair();
		let subject_token = self.subject.resolve().await?;
		let body = BearerRequestSigner::exchange_body(&key_pair.public_key_pem, &subject_token);
		let raw = retry::execute(&self.policy, self.token_field, |_| {
			let body = body.clone();

			async move {
				let mut request = TransportRequest::post(self.token_url.clone(), body);

				self.signer.sign(&mut request)?;

				Ok(self.transport.send(request).await?)
			}
		})
		.await?;
		let token = SecurityToken::new(raw);

		*self.token.write() = token.clone();

		Ok(token)
	}
}
impl Debug for BearerExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerExchange")
			.field("token_url", &self.token_url)
			.field("subject", &self.subject)
			.field("policy", &self.policy)
			.field("token_field", &self.token_field)
			.field("skew", &self.skew)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_endpoint_is_built_from_the_domain_host() {
		let url = BearerExchange::token_endpoint("id.example.com")
			.expect("Plain host should build an endpoint.");

		assert_eq!(url.as_str(), "https://id.example.com/oauth2/v1/token");

		let url = BearerExchange::token_endpoint("id.example.com:8443")
			.expect("Host with port should build an endpoint.");

		assert_eq!(url.as_str(), "https://id.example.com:8443/oauth2/v1/token");
	}

	#[test]
	fn invalid_hosts_are_rejected_before_any_network_call() {
		let error = BearerExchange::token_endpoint("not a host")
			.expect_err("Whitespace host must be rejected.");

		assert!(matches!(error, Error::Config(ConfigError::InvalidEndpoint { .. })));
	}
}
