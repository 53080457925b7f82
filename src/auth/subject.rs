//! Subject credentials presented to the issuer during a token exchange.

// self
use crate::{
	_prelude::*,
	error::{BoxError, ConfigError},
};

/// Boxed future returned by [`SubjectTokenProvider::subject_token`].
pub type SubjectTokenFuture<'a> = Pin<Box<dyn Future<Output = Result<String, BoxError>> + 'a + Send>>;

/// Source of dynamically issued subject tokens (CI systems, workload identity
/// agents, file mounts rotated out of band).
pub trait SubjectTokenProvider
where
	Self: Send + Sync,
{
	/// Produces the current subject token.
	fn subject_token(&self) -> SubjectTokenFuture<'_>;
}

/// Credential exchanged for a security token: either a fixed string or a
/// zero-argument asynchronous accessor.
///
/// Resolved fresh on every refresh cycle, never cached, so dynamic providers can
/// supply a rotated upstream token per exchange.
#[derive(Clone)]
pub enum SubjectCredential {
	/// Fixed third-party JWT.
	Static(String),
	/// Dynamic provider queried once per refresh cycle.
	Dynamic(Arc<dyn SubjectTokenProvider>),
}
impl SubjectCredential {
	/// Resolves the credential for the current refresh cycle.
	///
	/// A provider failure or an empty token aborts the cycle with a
	/// non-retriable configuration error: a failing external token source is
	/// assumed durably broken for this attempt.
	pub async fn resolve(&self) -> Result<String> {
		let token = match self {
			Self::Static(token) => token.clone(),
			Self::Dynamic(provider) => provider
				.subject_token()
				.await
				.map_err(|source| ConfigError::SubjectToken { source })?,
		};

		if token.is_empty() {
			return Err(ConfigError::EmptySubjectToken.into());
		}

		Ok(token)
	}
}
impl Debug for SubjectCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Static(_) => f.debug_tuple("SubjectCredential::Static").field(&"<redacted>").finish(),
			Self::Dynamic(_) => f.debug_tuple("SubjectCredential::Dynamic").field(&"..").finish(),
		}
	}
}
impl From<String> for SubjectCredential {
	fn from(token: String) -> Self {
		Self::Static(token)
	}
}
impl From<&str> for SubjectCredential {
	fn from(token: &str) -> Self {
		Self::Static(token.to_owned())
	}
}
impl From<Arc<dyn SubjectTokenProvider>> for SubjectCredential {
	fn from(provider: Arc<dyn SubjectTokenProvider>) -> Self {
		Self::Dynamic(provider)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::error::Error;

	struct CountingProvider {
		calls: AtomicUsize,
		token: &'static str,
	}
	impl SubjectTokenProvider for CountingProvider {
		fn subject_token(&self) -> SubjectTokenFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move { Ok(self.token.to_owned()) })
		}
	}

	#[tokio::test]
	async fn static_credentials_resolve_to_their_value() {
		let credential = SubjectCredential::from("upstream.jwt.value");

		assert_eq!(
			credential.resolve().await.expect("Static credential should resolve."),
			"upstream.jwt.value",
		);
	}

	#[tokio::test]
	async fn dynamic_credentials_query_the_provider() {
		let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), token: "dyn.jwt" });
		let credential = SubjectCredential::Dynamic(provider.clone());

		credential.resolve().await.expect("Dynamic credential should resolve.");
		credential.resolve().await.expect("Dynamic credential should resolve again.");

		assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn empty_tokens_abort_with_a_non_retriable_error() {
		let credential = SubjectCredential::from("");
		let error = credential.resolve().await.expect_err("Empty token must be rejected.");

		assert!(matches!(error, Error::Config(ConfigError::EmptySubjectToken)));
		assert!(!error.is_retriable());
	}

	#[tokio::test]
	async fn provider_failures_surface_as_config_errors() {
		struct FailingProvider;
		impl SubjectTokenProvider for FailingProvider {
			fn subject_token(&self) -> SubjectTokenFuture<'_> {
				Box::pin(async { Err("token file missing".into()) })
			}
		}

		let credential = SubjectCredential::Dynamic(Arc::new(FailingProvider));
		let error = credential.resolve().await.expect_err("Provider failure must propagate.");

		assert!(matches!(error, Error::Config(ConfigError::SubjectToken { .. })));
		assert!(!error.is_retriable());
	}
}
