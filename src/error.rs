//! Error taxonomy shared across federation clients, signers, and the retry driver.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical federation error exposed by public APIs.
///
/// Terminal variants are reported as non-retriable through [`Error::is_retriable`]
/// so an enclosing general-purpose retry wrapper never retries an authentication
/// failure whose inner policy already exhausted its attempts.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal, raised before any network call.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); retriable within the policy.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request signature could not be produced; fatal.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Token endpoint returned a structurally unusable success response; terminal.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponse),
	/// Bearer token payload could not be decoded into a claim set.
	#[error(transparent)]
	MalformedToken(#[from] MalformedTokenError),

	/// Issuer rejected the exchange with a client error; terminal, never retried.
	#[error("Token endpoint rejected the exchange with status {status}.")]
	ClientRejection {
		/// HTTP status code in `[400, 500)`.
		status: u16,
		/// Response body surfaced verbatim for diagnostics.
		body: String,
	},
	/// Issuer failed with a server error; retriable within the policy.
	#[error("Token endpoint failed with status {status}.")]
	ServerFault {
		/// HTTP status code (`>= 500` or any other non-200).
		status: u16,
		/// Response body surfaced verbatim for diagnostics.
		body: String,
	},
	/// Retry policy exhausted its attempts; the last error is preserved as cause.
	#[error("Token exchange failed after {attempts} attempts.")]
	RetriesExhausted {
		/// Number of attempts performed before giving up.
		attempts: u32,
		/// Last transport or server error observed.
		#[source]
		source: Box<Error>,
	},
	/// Circuit breaker is open; the exchange was short-circuited without a network call.
	#[error("Circuit breaker is open; token exchange short-circuited.")]
	CircuitOpen,
	/// Failure observed by a caller that joined an in-flight single-flight refresh.
	#[error("Shared refresh cycle failed.")]
	SharedRefresh(#[source] Arc<Error>),
}
impl Error {
	/// Returns `true` when an enclosing layer may retry the operation.
	///
	/// Only transport failures and server faults that have not yet run through a
	/// retry policy qualify; every terminal variant, including
	/// [`Error::RetriesExhausted`], answers `false`.
	pub fn is_retriable(&self) -> bool {
		match self {
			Self::Transport(_) | Self::ServerFault { .. } => true,
			Self::SharedRefresh(source) => source.is_retriable(),
			_ => false,
		}
	}
}

/// Configuration and validation failures raised before any network call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Session key pair could not be generated or encoded.
	#[error("Session key pair could not be generated.")]
	KeyGeneration {
		/// Underlying RSA or encoding failure.
		#[source]
		source: BoxError,
	},
	/// Certificate material could not be parsed.
	#[error("Certificate material could not be parsed: {message}.")]
	InvalidCertificate {
		/// Human-readable parse failure.
		message: String,
	},
	/// Leaf certificate carries no tenancy identifier.
	#[error("Leaf certificate carries no tenancy identifier.")]
	MissingTenancy,
	/// Configured tenancy does not match the one in the leaf certificate.
	#[error("Configured tenancy `{configured}` does not match certificate tenancy `{certificate}`.")]
	TenancyMismatch {
		/// Tenancy identifier the client was constructed with.
		configured: String,
		/// Tenancy identifier parsed out of the leaf certificate.
		certificate: String,
	},
	/// Dynamic subject-token provider failed to produce a credential.
	#[error("Subject token provider failed.")]
	SubjectToken {
		/// Provider-specific failure.
		#[source]
		source: BoxError,
	},
	/// Subject-token provider returned an empty credential.
	#[error("Subject token is empty.")]
	EmptySubjectToken,
	/// Endpoint host is not a valid URL component.
	#[error("Token endpoint is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Request-signing failures; fatal, never retried.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// No private key is available for the leaf certificate.
	#[error("Leaf certificate has no private key.")]
	MissingPrivateKey,
	/// Request URI carries no host to sign.
	#[error("Request URI carries no host.")]
	MissingHost,
	/// A signed header holds a value that cannot be encoded or read back.
	#[error("Header `{header}` could not be encoded for signing.")]
	HeaderValue {
		/// Name of the offending header.
		header: String,
	},
	/// Request payload could not be serialized.
	#[error("Exchange request payload could not be serialized: {message}.")]
	Payload {
		/// Human-readable serialization failure.
		message: String,
	},
	/// RSA signature computation failed.
	#[error("Request signature could not be computed.")]
	Signature {
		/// Underlying RSA failure.
		#[source]
		source: rsa::Error,
	},
}

/// Structurally unusable token endpoint success responses; terminal, never
/// retried, because a malformed 200 cannot self-correct.
#[derive(Debug, ThisError)]
pub enum MalformedResponse {
	/// Response body is not valid JSON.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Response parsed but lacks the expected token field.
	#[error("Token endpoint response is missing the `{field}` field.")]
	MissingToken {
		/// Field name(s) the parser accepted.
		field: &'static str,
	},
	/// Response carries an empty token string.
	#[error("Token endpoint returned an empty token.")]
	EmptyToken,
}

/// Bearer-token payload decode failures.
///
/// Variants hold rendered messages instead of sources so a decode outcome can be
/// cached inside an immutable [`SecurityToken`](crate::auth::SecurityToken) and
/// cloned to every caller that requests the claim set.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MalformedTokenError {
	/// Bearer string has no payload segment.
	#[error("Bearer token has no payload segment.")]
	MissingPayload,
	/// Payload segment is not valid base64url.
	#[error("Token payload is not valid base64url: {message}.")]
	PayloadEncoding {
		/// Human-readable decode failure.
		message: String,
	},
	/// Payload decodes but is not a JSON object.
	#[error("Token payload is not a JSON claim object: {message}.")]
	PayloadJson {
		/// Human-readable parse failure.
		message: String,
	},
}
