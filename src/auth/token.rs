//! Immutable security-token value with expiry tracking and lazy claim decoding.

// std
use std::sync::OnceLock;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;
// self
use crate::{_prelude::*, error::MalformedTokenError};

/// Decoded claim set of a bearer token.
pub type ClaimMap = serde_json::Map<String, Value>;

/// Safety margin subtracted from a token's expiry so it is treated as invalid
/// slightly before literal expiration.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::seconds(60);

/// Short-lived bearer credential issued by the federation service.
///
/// Immutable once constructed; a refresh produces a wholly new instance. The
/// payload segment is decoded without signature verification; trust is
/// established by TLS to the issuer and possession of the token. Claim decoding
/// is deferred to first access and its outcome is shared across clones, so a
/// token that is usable as a bearer string but carries an undecodable payload
/// still flows through the system.
#[derive(Clone)]
pub struct SecurityToken {
	raw: String,
	expires_at: OffsetDateTime,
	claims: Arc<OnceLock<Result<ClaimMap, MalformedTokenError>>>,
}
impl SecurityToken {
	/// Wraps a raw bearer string, decoding its expiry on a best-effort basis.
	///
	/// An undecodable payload or missing `exp` claim yields an always-invalid
	/// expiry; the raw bearer string remains usable either way.
	pub fn new(raw: impl Into<String>) -> Self {
		let raw = raw.into();
		let expires_at = decode_payload(&raw)
			.ok()
			.and_then(|claims| claims.get("exp")?.as_i64())
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
			.unwrap_or(OffsetDateTime::UNIX_EPOCH);

		Self { raw, expires_at, claims: Arc::new(OnceLock::new()) }
	}

	/// Returns the always-invalid initial cache value used before any exchange.
	pub fn placeholder() -> Self {
		Self::new("")
	}

	/// Returns the raw bearer string.
	pub fn raw(&self) -> &str {
		&self.raw
	}

	/// Returns the decoded expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Returns `true` iff `now < expires_at - skew`.
	pub fn is_valid_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		now < self.expires_at - skew
	}

	/// Validity check against the current UTC clock.
	pub fn is_valid(&self, skew: Duration) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc(), skew)
	}

	/// Returns the claim value as a string, or `None` when the claim is absent
	/// or the payload cannot be decoded. Never errors.
	pub fn string_claim(&self, key: &str) -> Option<String> {
		let value = self.claims().as_ref().ok()?.get(key)?;

		match value {
			Value::String(s) => Some(s.clone()),
			other => Some(other.to_string()),
		}
	}

	/// Returns the decoded claim set, surfacing [`MalformedTokenError`] for
	/// callers that require one.
	pub fn decoded_claims(&self) -> Result<&ClaimMap, MalformedTokenError> {
		self.claims().as_ref().map_err(Clone::clone)
	}

	fn claims(&self) -> &Result<ClaimMap, MalformedTokenError> {
		self.claims.get_or_init(|| decode_payload(&self.raw))
	}
}
impl Debug for SecurityToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecurityToken")
			.field("raw", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

fn decode_payload(raw: &str) -> Result<ClaimMap, MalformedTokenError> {
	let payload = raw.split('.').nth(1).ok_or(MalformedTokenError::MissingPayload)?;
	// Some issuers pad the payload segment; base64url JWT segments are unpadded.
	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|e| MalformedTokenError::PayloadEncoding { message: e.to_string() })?;
	let value: Value = serde_json::from_slice(&bytes)
		.map_err(|e| MalformedTokenError::PayloadJson { message: e.to_string() })?;

	match value {
		Value::Object(map) => Ok(map),
		other => Err(MalformedTokenError::PayloadJson {
			message: format!("expected an object, got {other}"),
		}),
	}
}
