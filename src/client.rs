//! Federation client variants.
//!
//! Three variants cover the supported local credentials: leaf certificates
//! ([`X509FederationClient`]), third-party JWTs
//! ([`SubjectTokenFederationClient`]), and workload-identity subject tokens
//! ([`WorkloadIdentityFederationClient`], the only variant that deduplicates
//! concurrent refreshes). All of them drive the same retry loop and cache
//! discipline; only credential acquisition and request signing differ.

pub mod subject_token;
pub mod workload;
pub mod x509;

mod exchange;

pub use subject_token::*;
pub use workload::*;
pub use x509::*;

// self
use crate::{_prelude::*, auth::SecurityToken};

/// Boxed future returned by [`FederationClient`] operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Object-safe facade over the federation client variants.
///
/// Callers hold an `Arc<dyn FederationClient>` and stay agnostic of which
/// credential backs their tokens.
pub trait FederationClient
where
	Self: Send + Sync,
{
	/// Returns the cached token when still valid, otherwise runs a refresh
	/// cycle and returns the fresh token.
	fn security_token(&self) -> ClientFuture<'_, SecurityToken>;

	/// Runs a refresh cycle regardless of cache validity.
	fn refresh_security_token(&self) -> ClientFuture<'_, SecurityToken>;

	/// Ensures a valid token, then reads one claim from it.
	///
	/// Resolves to `None` when the claim is absent or the token payload cannot
	/// be decoded.
	fn string_claim<'a>(&'a self, key: &'a str) -> ClientFuture<'a, Option<String>>;
}
