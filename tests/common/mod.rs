// Shared fixtures for the federation integration tests.

#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use oci_federation::{
	auth::{RsaSessionKeySupplier, SessionKeySupplier},
	http::ReqwestTransport,
	retry::RetryPolicy,
};

pub const CLIENT_CREDENTIALS: &str = "Y2xpZW50OnNlY3JldA==";

/// Builds an unsigned JWT whose `exp` lies `lifetime_secs` in the future.
pub fn issued_jwt(lifetime_secs: i64) -> String {
	let exp = time::OffsetDateTime::now_utc().unix_timestamp() + lifetime_secs;
	let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"RS256\",\"typ\":\"JWT\"}");
	let payload = URL_SAFE_NO_PAD
		.encode(format!("{{\"sub\":\"test-principal\",\"exp\":{exp}}}").as_bytes());

	format!("{header}.{payload}.signature")
}

/// Retry policy with short delays so exhaustion tests finish quickly.
pub fn fast_policy() -> RetryPolicy {
	RetryPolicy::new(3, StdDuration::from_millis(50))
}

/// Small session keys keep test runs fast; production callers use the default.
pub fn session_supplier() -> Arc<dyn SessionKeySupplier> {
	Arc::new(
		RsaSessionKeySupplier::with_bits(1024)
			.expect("Session key supplier should construct for tests."),
	)
}

pub fn transport() -> Arc<ReqwestTransport> {
	Arc::new(ReqwestTransport::default())
}
