//! Federation client exchanging an X.509 leaf certificate for security tokens.

// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_CLOCK_SKEW, SecurityToken, SessionKeySupplier},
	breaker::{CircuitBreaker, CircuitBreakerConfig},
	cert::{self, CertificateSupplier, Refreshability},
	client::{ClientFuture, FederationClient},
	error::{ConfigError, SigningError},
	http::{TokenTransport, TransportRequest},
	obs::{self, ExchangeKind, ExchangeOutcome, ExchangeSpan},
	retry::{self, RetryPolicy, TokenField},
	sign::CertificateRequestSigner,
};

const DEFAULT_PURPOSE: &str = "DEFAULT";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificateExchangeBody {
	certificate: String,
	purpose: String,
	public_key: String,
	intermediate_certificates: Vec<String>,
}

/// Exchanges an instance leaf certificate for security tokens against the
/// federation endpoint's `/v1/x509` operation.
///
/// Every refresh cycle re-acquires refreshable certificate suppliers and
/// rotates the session key pair before signing the exchange request with the
/// leaf certificate's private key. A per-client circuit breaker wraps the
/// transport attempts so a durably failing federation endpoint short-circuits
/// refreshes with [`Error::CircuitOpen`] instead of burning full retry cycles.
pub struct X509FederationClient {
	transport: Arc<dyn TokenTransport>,
	endpoint: Url,
	tenancy_id: String,
	purpose: String,
	leaf: Arc<dyn CertificateSupplier>,
	intermediates: Vec<Arc<dyn CertificateSupplier>>,
	session_keys: Arc<dyn SessionKeySupplier>,
	policy: RetryPolicy,
	token_field: TokenField,
	skew: Duration,
	breaker: CircuitBreaker,
	token: RwLock<SecurityToken>,
}
impl X509FederationClient {
	/// Creates a client against `<federation_endpoint>/v1/x509` with default
	/// purpose, retry, token field, clock skew, and breaker settings.
	pub fn new(
		transport: Arc<dyn TokenTransport>,
		federation_endpoint: &str,
		tenancy_id: impl Into<String>,
		leaf: Arc<dyn CertificateSupplier>,
		intermediates: Vec<Arc<dyn CertificateSupplier>>,
		session_keys: Arc<dyn SessionKeySupplier>,
	) -> Result<Self> {
		let endpoint = Url::parse(&format!("{}/v1/x509", federation_endpoint.trim_end_matches('/')))
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Ok(Self {
			transport,
			endpoint,
			tenancy_id: tenancy_id.into(),
			purpose: DEFAULT_PURPOSE.to_owned(),
			leaf,
			intermediates,
			session_keys,
			policy: RetryPolicy::default(),
			token_field: TokenField::default(),
			skew: DEFAULT_CLOCK_SKEW,
			breaker: CircuitBreaker::default(),
			token: RwLock::new(SecurityToken::placeholder()),
		})
	}

	/// Replaces the exchange purpose.
	///
	/// The tenancy-match requirement only applies to the default purpose;
	/// service-level purposes exchange certificates issued outside the
	/// configured tenancy.
	pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
		self.purpose = purpose.into();

		self
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Replaces the success-body token field selection.
	pub fn with_token_field(mut self, field: TokenField) -> Self {
		self.token_field = field;

		self
	}

	/// Replaces the clock-skew safety margin applied to cache validity.
	pub fn with_clock_skew(mut self, skew: Duration) -> Self {
		self.skew = skew;

		self
	}

	/// Replaces the circuit breaker configuration.
	pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
		self.breaker = CircuitBreaker::new(config);

		self
	}

	fn cached(&self) -> Option<SecurityToken> {
		let token = self.token.read();

		token.is_valid(self.skew).then(|| token.clone())
	}

	async fn refresh(&self) -> Result<SecurityToken> {
		let span = ExchangeSpan::new(ExchangeKind::X509, "refresh");

		obs::record_exchange_outcome(ExchangeKind::X509, ExchangeOutcome::Attempt);

		let result = span.instrument(self.refresh_inner()).await;

		obs::record_exchange_outcome(
			ExchangeKind::X509,
			if result.is_ok() { ExchangeOutcome::Success } else { ExchangeOutcome::Failure },
		);

		result
	}

	async fn refresh_inner(&self) -> Result<SecurityToken> {
		if self.leaf.refreshability() == Refreshability::Refreshable {
			self.leaf.refresh().await?;
		}
		for intermediate in &self.intermediates {
			if intermediate.refreshability() == Refreshability::Refreshable {
				intermediate.refresh().await?;
			}
		}

		self.session_keys.refresh_keys().await?;

		let leaf = self.leaf.material();
		let leaf_der = cert::certificate_der(&leaf.certificate_pem)?;
		let tenancy = cert::tenancy_id(&leaf_der)?.ok_or(ConfigError::MissingTenancy)?;

		// Instance certificates for the default purpose must belong to the
		// configured tenancy; reject before any network call.
		if self.purpose == DEFAULT_PURPOSE && tenancy != self.tenancy_id {
			return Err(ConfigError::TenancyMismatch {
				configured: self.tenancy_id.clone(),
				certificate: tenancy,
			}
			.into());
		}

		let private_key = leaf.private_key.ok_or(SigningError::MissingPrivateKey)?;
		let signer =
			CertificateRequestSigner::new(&tenancy, &cert::fingerprint(&leaf_der), private_key);
		let key_pair = self.session_keys.key_pair();
		let body = CertificateExchangeBody {
			certificate: cert::sanitize_pem(&leaf.certificate_pem),
			purpose: self.purpose.clone(),
			public_key: cert::sanitize_pem(&key_pair.public_key_pem),
			intermediate_certificates: self
				.intermediates
				.iter()
				.map(|supplier| cert::sanitize_pem(&supplier.material().certificate_pem))
				.collect(),
		};
		let body = serde_json::to_vec(&body)
			.map_err(|e| SigningError::Payload { message: e.to_string() })?;
		let signer = &signer;
		let raw = retry::execute(&self.policy, self.token_field, |_| {
			let body = body.clone();

			async move {
				if !self.breaker.try_acquire() {
					return Err(Error::CircuitOpen);
				}

				let mut request = TransportRequest::post(self.endpoint.clone(), body);

				signer.sign(&mut request)?;

				match self.transport.send(request).await {
					Ok(response) => {
						if response.status >= 500 {
							self.breaker.record_failure();
						} else {
							self.breaker.record_success();
						}

						Ok(response)
					},
					Err(error) => {
						self.breaker.record_failure();

						Err(error.into())
					},
				}
			}
		})
		.await?;
		let token = SecurityToken::new(raw);

		*self.token.write() = token.clone();

		Ok(token)
	}
}
impl FederationClient for X509FederationClient {
	fn security_token(&self) -> ClientFuture<'_, SecurityToken> {
		Box::pin(async move {
			if let Some(token) = self.cached() {
				return Ok(token);
			}

			self.refresh().await
		})
	}

	fn refresh_security_token(&self) -> ClientFuture<'_, SecurityToken> {
		Box::pin(self.refresh())
	}

	fn string_claim<'a>(&'a self, key: &'a str) -> ClientFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.security_token().await?.string_claim(key)) })
	}
}
impl Debug for X509FederationClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("X509FederationClient")
			.field("endpoint", &self.endpoint)
			.field("tenancy_id", &self.tenancy_id)
			.field("purpose", &self.purpose)
			.field("policy", &self.policy)
			.field("token_field", &self.token_field)
			.field("skew", &self.skew)
			.finish()
	}
}
