//! Retry policy and the shared exchange driver.
//!
//! [`RetryPolicy`] is a pure decision function over an attempt count and an
//! [`Outcome`]; [`execute`] is the one driver every federation client variant
//! runs its exchange through, so retry semantics cannot diverge between
//! variants. The policy is an explicitly constructed immutable value passed in
//! at client construction; there is no shared default singleton.
//!
//! Classification is deliberately asymmetric: transport failures and server
//! faults retry up to [`RetryPolicy::max_attempts`] with a fixed delay (a fast,
//! bounded failure signal, no exponential backoff on this path), while client
//! rejections and malformed success responses fail terminally on the first
//! observation. On exhaustion the last error is wrapped in
//! [`Error::RetriesExhausted`], which answers `false` to
//! [`Error::is_retriable`] so outer layers never compound the retries.

// self
use crate::{
	_prelude::*,
	error::{MalformedResponse, TransportError},
	http::TransportResponse,
};

/// Default number of attempts per refresh cycle.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: StdDuration = StdDuration::from_secs(1);

/// Immutable retry configuration for one federation client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum number of attempts, including the first.
	pub max_attempts: u32,
	/// Fixed delay between attempts.
	pub delay: StdDuration,
}
impl RetryPolicy {
	/// Creates a policy with explicit attempt and delay settings.
	pub fn new(max_attempts: u32, delay: StdDuration) -> Self {
		Self { max_attempts: max_attempts.max(1), delay }
	}

	/// Decides how the cycle proceeds after `attempt` produced `outcome`.
	pub fn decide(&self, attempt: u32, outcome: Outcome) -> Decision {
		match outcome {
			Outcome::Token(token) => Decision::Succeed(token),
			Outcome::Malformed(error) => Decision::Fail(error),
			Outcome::Transport(error) =>
				if attempt < self.max_attempts {
					Decision::Retry(self.delay)
				} else {
					Decision::Fail(Error::RetriesExhausted {
						attempts: self.max_attempts,
						source: Box::new(error.into()),
					})
				},
			Outcome::Status { status, body } if (400..500).contains(&status) =>
				Decision::Fail(Error::ClientRejection { status, body }),
			Outcome::Status { status, body } =>
				if attempt < self.max_attempts {
					Decision::Retry(self.delay)
				} else {
					Decision::Fail(Error::RetriesExhausted {
						attempts: self.max_attempts,
						source: Box::new(Error::ServerFault { status, body }),
					})
				},
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay: DEFAULT_RETRY_DELAY }
	}
}

/// Classified result of one exchange attempt.
#[derive(Debug)]
pub enum Outcome {
	/// 200 response whose body parsed into a non-empty token.
	Token(String),
	/// 200 response that failed to parse or lacked a usable token field.
	Malformed(Error),
	/// Non-200 response.
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, kept for diagnostics.
		body: String,
	},
	/// Transport-level failure before a status code was available.
	Transport(TransportError),
}

/// Verdict produced by [`RetryPolicy::decide`].
#[derive(Debug)]
pub enum Decision {
	/// Terminate the cycle successfully with the parsed token.
	Succeed(String),
	/// Sleep for the delay and run another attempt.
	Retry(StdDuration),
	/// Terminate the cycle with a terminal error.
	Fail(Error),
}

/// Which success-body field carries the issued token.
///
/// One issuer generation responds with `token`, another with `access_token`;
/// [`TokenField::Auto`] accepts either, preferring `token`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenField {
	/// Accept `token` or `access_token`, preferring `token`.
	#[default]
	Auto,
	/// Require the `token` field.
	Token,
	/// Require the `access_token` field.
	AccessToken,
}
impl TokenField {
	/// Returns the field name(s) reported in missing-token errors.
	pub const fn expected(self) -> &'static str {
		match self {
			TokenField::Auto => "token|access_token",
			TokenField::Token => "token",
			TokenField::AccessToken => "access_token",
		}
	}
}

#[derive(Debug, Deserialize)]
struct ExchangeResponseBody {
	token: Option<String>,
	access_token: Option<String>,
}

/// Extracts the issued token from a 200 response body.
pub fn parse_token_response(body: &str, field: TokenField) -> Result<String, MalformedResponse> {
	let de = &mut serde_json::Deserializer::from_str(body);
	let parsed: ExchangeResponseBody = serde_path_to_error::deserialize(de)
		.map_err(|source| MalformedResponse::Parse { source })?;
	let value = match field {
		TokenField::Token => parsed.token,
		TokenField::AccessToken => parsed.access_token,
		TokenField::Auto => parsed.token.or(parsed.access_token),
	};

	match value {
		Some(token) if !token.is_empty() => Ok(token),
		Some(_) => Err(MalformedResponse::EmptyToken),
		None => Err(MalformedResponse::MissingToken { field: field.expected() }),
	}
}

/// Runs one refresh cycle's attempts through the policy.
///
/// `attempt` builds, signs, and sends the exchange request; returning
/// [`Error::Transport`] feeds the retry classification, while any other error
/// (signing, configuration, open circuit) aborts the cycle immediately.
pub(crate) async fn execute<F, Fut>(
	policy: &RetryPolicy,
	field: TokenField,
	mut attempt: F,
) -> Result<String>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<TransportResponse>>,
{
	let mut attempt_no = 1;

	loop {
		let outcome = match attempt(attempt_no).await {
			Ok(response) if response.status == 200 =>
				match parse_token_response(&response.body, field) {
					Ok(token) => Outcome::Token(token),
					Err(error) => Outcome::Malformed(error.into()),
				},
			Ok(response) => Outcome::Status { status: response.status, body: response.body },
			Err(Error::Transport(error)) => Outcome::Transport(error),
			Err(error) => return Err(error),
		};

		match policy.decide(attempt_no, outcome) {
			Decision::Succeed(token) => return Ok(token),
			Decision::Fail(error) => return Err(error),
			Decision::Retry(delay) => {
				tokio::time::sleep(delay).await;

				attempt_no += 1;
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn policy() -> RetryPolicy {
		RetryPolicy::default()
	}

	fn transport_outcome() -> Outcome {
		Outcome::Transport(TransportError::Io(std::io::Error::other("connection reset")))
	}

	#[test]
	fn defaults_are_fast_and_bounded() {
		let policy = policy();

		assert_eq!(policy.max_attempts, 3);
		assert_eq!(policy.delay, StdDuration::from_secs(1));
	}

	#[test]
	fn transport_errors_retry_until_exhaustion() {
		let policy = policy();

		assert!(matches!(policy.decide(1, transport_outcome()), Decision::Retry(delay) if delay == policy.delay));
		assert!(matches!(policy.decide(2, transport_outcome()), Decision::Retry(_)));

		let Decision::Fail(error) = policy.decide(3, transport_outcome()) else {
			panic!("Third transport failure should exhaust the policy.");
		};

		assert!(matches!(error, Error::RetriesExhausted { attempts: 3, .. }));
		assert!(!error.is_retriable());
	}

	#[test]
	fn client_errors_fail_on_first_observation() {
		let outcome = Outcome::Status { status: 401, body: "unauthorized".into() };
		let Decision::Fail(error) = policy().decide(1, outcome) else {
			panic!("401 must not be retried.");
		};

		assert!(matches!(error, Error::ClientRejection { status: 401, .. }));
	}

	#[test]
	fn server_errors_retry_then_preserve_last_fault() {
		let policy = policy();
		let outcome = |body: &str| Outcome::Status { status: 503, body: body.into() };

		assert!(matches!(policy.decide(1, outcome("first")), Decision::Retry(_)));

		let Decision::Fail(error) = policy.decide(3, outcome("last")) else {
			panic!("Exhausted server faults should fail terminally.");
		};
		let Error::RetriesExhausted { source, .. } = error else {
			panic!("Exhaustion should wrap the last server fault.");
		};

		assert!(matches!(*source, Error::ServerFault { status: 503, ref body } if body == "last"));
	}

	#[test]
	fn malformed_success_is_terminal_at_any_attempt() {
		let outcome =
			Outcome::Malformed(Error::MalformedResponse(MalformedResponse::EmptyToken));

		assert!(matches!(policy().decide(1, outcome), Decision::Fail(_)));
	}

	#[test]
	fn parse_accepts_either_field_in_auto_mode() {
		assert_eq!(
			parse_token_response("{\"token\":\"abc\"}", TokenField::Auto)
				.expect("token field should parse"),
			"abc",
		);
		assert_eq!(
			parse_token_response("{\"access_token\":\"def\"}", TokenField::Auto)
				.expect("access_token field should parse"),
			"def",
		);
		assert_eq!(
			parse_token_response("{\"token\":\"abc\",\"access_token\":\"def\"}", TokenField::Auto)
				.expect("both fields should parse"),
			"abc",
		);
	}

	#[test]
	fn parse_respects_explicit_field_selection() {
		let err = parse_token_response("{\"access_token\":\"def\"}", TokenField::Token)
			.expect_err("token-only mode must reject access_token bodies");

		assert!(matches!(err, MalformedResponse::MissingToken { field: "token" }));
	}

	#[test]
	fn parse_rejects_empty_and_malformed_bodies() {
		assert!(matches!(
			parse_token_response("{\"token\":\"\"}", TokenField::Auto),
			Err(MalformedResponse::EmptyToken),
		));
		assert!(matches!(
			parse_token_response("not json", TokenField::Auto),
			Err(MalformedResponse::Parse { .. }),
		));
		assert!(matches!(
			parse_token_response("{}", TokenField::Auto),
			Err(MalformedResponse::MissingToken { .. }),
		));
	}
}
