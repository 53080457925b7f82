//! Workload-identity federation client with single-flight refresh.

// crates.io
use futures::{FutureExt, future::Shared};
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

type SharedRefresh =
	Shared<Pin<Box<dyn Future<Output = Result<SecurityToken, Arc<Error>>> + Send>>>;

/// Exchanges a workload-identity subject token for security tokens,
/// deduplicating concurrent refreshes.
///
/// This is the one variant expected to serve request-scoped fan-out: when many
/// tasks observe an expired cache at once, only the first starts a refresh
/// cycle and the rest await its shared outcome. The shared outcome includes
/// failures, so a refresh error is reported once per cycle to every waiter
/// instead of triggering one full retry cycle per caller.
pub struct WorkloadIdentityFederationClient {
	core: Arc<BearerExchange>,
	inflight: Mutex<Option<SharedRefresh>>,
}
impl WorkloadIdentityFederationClient {
	/// Creates a client against `https://<domain_host>/oauth2/v1/token` with
	/// default retry, token field, and clock skew settings.
	pub fn new(
		transport: Arc<dyn TokenTransport>,
		domain_host: &str,
		client_credentials: impl Into<String>,
		subject: impl Into<SubjectCredential>,
		session_keys: Arc<dyn SessionKeySupplier>,
	) -> Result<Self> {
		Ok(Self {
			core: Arc::new(BearerExchange::new(
				transport,
				BearerExchange::token_endpoint(domain_host)?,
				subject.into(),
				BearerRequestSigner::new(client_credentials),
				session_keys,
				RetryPolicy::default(),
				TokenField::default(),
				DEFAULT_CLOCK_SKEW,
			)),
			inflight: Mutex::new(None),
		})
	}

	/// Replaces the token endpoint entirely, bypassing the
	/// `https://<domain_host>/oauth2/v1/token` convention. Intended for
	/// gateways and test servers that front the issuer on a non-default URL.
	pub fn with_token_endpoint(self, token_url: Url) -> Self {
		self.update_core(|core| *core.token_url_mut() = token_url)
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
		self.update_core(|core| *core.policy_mut() = policy)
	}

	/// Replaces the success-body token field selection.
	pub fn with_token_field(self, field: TokenField) -> Self {
		self.update_core(|core| *core.token_field_mut() = field)
	}

	/// Replaces the clock-skew safety margin applied to cache validity.
	pub fn with_clock_skew(self, skew: Duration) -> Self {
		self.update_core(|core| *core.skew_mut() = skew)
	}

	// A refresh cycle abandoned mid-flight (a caller dropped its future) can
	// keep a clone of the core alive through the slot; rebuild from a snapshot
	// in that case and discard the stale cycle along with its slot entry.
	fn update_core(self, update: impl FnOnce(&mut BearerExchange)) -> Self {
		let mut core = Arc::try_unwrap(self.core).unwrap_or_else(|shared| shared.duplicate());

		update(&mut core);

		Self { core: Arc::new(core), inflight: Mutex::new(None) }
	}

	// Joins the in-flight refresh cycle, starting one when none exists. Every
	// participant clears the slot after the cycle settles; the pointer
	// comparison makes the clear unconditional for the cycle it joined while
	// leaving a newer cycle's slot untouched.
	async fn join_refresh(&self) -> Result<SecurityToken> {
		let handle = {
			let mut slot = self.inflight.lock();

			match slot.as_ref() {
				Some(handle) => handle.clone(),
				None => {
					let core = self.core.clone();
					let handle: SharedRefresh = async move {
						core.refresh(ExchangeKind::WorkloadIdentity).await.map_err(Arc::new)
					}
					.boxed()
					.shared();

					*slot = Some(handle.clone());

					handle
				},
			}
		};
		let result = handle.clone().await;
		let mut slot = self.inflight.lock();

		if slot.as_ref().is_some_and(|current| Shared::ptr_eq(current, &handle)) {
			*slot = None;
		}

		result.map_err(Error::SharedRefresh)
	}
}
impl FederationClient for WorkloadIdentityFederationClient {
	fn security_token(&self) -> ClientFuture<'_, SecurityToken> {
		Box::pin(async move {
			if let Some(token) = self.core.cached() {
				return Ok(token);
			}

			self.join_refresh().await
		})
	}

	fn refresh_security_token(&self) -> ClientFuture<'_, SecurityToken> {
		Box::pin(self.join_refresh())
	}

	fn string_claim<'a>(&'a self, key: &'a str) -> ClientFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.security_token().await?.string_claim(key)) })
	}
}
impl Debug for WorkloadIdentityFederationClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WorkloadIdentityFederationClient").field("core", &self.core).finish()
	}
}
