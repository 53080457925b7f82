//! Per-client circuit breaker around federation transport calls.
//!
//! Repeated upstream failures open the circuit so future refresh attempts
//! short-circuit with [`Error::CircuitOpen`](crate::error::Error::CircuitOpen)
//! instead of waiting out the full retry policy. The breaker wraps each
//! transport attempt and is orthogonal to the retry policy, not a replacement
//! for it. Scope is per client instance; failure state is never shared across
//! clients.

// std
use std::time::Instant;
// self
use crate::_prelude::*;

/// Circuit breaker tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct CircuitBreakerConfig {
	/// Consecutive failures that open the circuit.
	pub failure_threshold: u32,
	/// Half-open successes required to close it again.
	pub success_threshold: u32,
	/// How long the circuit stays open before probing.
	pub reset_timeout: StdDuration,
}
impl Default for CircuitBreakerConfig {
	fn default() -> Self {
		Self {
			failure_threshold: 5,
			success_threshold: 2,
			reset_timeout: StdDuration::from_secs(30),
		}
	}
}

/// Observable breaker state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
	/// Calls flow normally.
	Closed,
	/// Calls are short-circuited.
	Open,
	/// Probing with limited calls after the reset timeout.
	HalfOpen,
}

#[derive(Debug)]
struct CircuitInner {
	state: CircuitState,
	opened_at: Option<Instant>,
	failures: u32,
	successes: u32,
}

/// Mutex-guarded breaker; all methods are synchronous and never held across an
/// await point.
#[derive(Debug)]
pub struct CircuitBreaker {
	config: CircuitBreakerConfig,
	inner: Mutex<CircuitInner>,
}
impl CircuitBreaker {
	/// Creates a breaker with the provided configuration.
	pub fn new(config: CircuitBreakerConfig) -> Self {
		Self {
			config,
			inner: Mutex::new(CircuitInner {
				state: CircuitState::Closed,
				opened_at: None,
				failures: 0,
				successes: 0,
			}),
		}
	}

	/// Returns `true` when a call may proceed, transitioning Open to HalfOpen
	/// once the reset timeout has elapsed.
	pub fn try_acquire(&self) -> bool {
		let mut inner = self.inner.lock();

		match inner.state {
			CircuitState::Closed | CircuitState::HalfOpen => true,
			CircuitState::Open => {
				let elapsed =
					inner.opened_at.map(|instant| instant.elapsed()).unwrap_or_default();

				if elapsed >= self.config.reset_timeout {
					inner.state = CircuitState::HalfOpen;
					inner.successes = 0;

					true
				} else {
					false
				}
			},
		}
	}

	/// Records a successful transport attempt.
	pub fn record_success(&self) {
		let mut inner = self.inner.lock();

		match inner.state {
			CircuitState::HalfOpen => {
				inner.successes += 1;

				if inner.successes >= self.config.success_threshold {
					inner.state = CircuitState::Closed;
					inner.opened_at = None;
					inner.failures = 0;
					inner.successes = 0;
				}
			},
			CircuitState::Closed => inner.failures = 0,
			CircuitState::Open => {},
		}
	}

	/// Records a failed transport attempt.
	pub fn record_failure(&self) {
		let mut inner = self.inner.lock();

		if matches!(inner.state, CircuitState::HalfOpen) {
			inner.state = CircuitState::Open;
			inner.opened_at = Some(Instant::now());
			inner.failures = 0;

			return;
		}

		inner.failures += 1;

		if inner.failures >= self.config.failure_threshold {
			inner.state = CircuitState::Open;
			inner.opened_at = Some(Instant::now());
			inner.failures = 0;
		}
	}

	/// Returns the current state without transitioning it.
	pub fn state(&self) -> CircuitState {
		self.inner.lock().state
	}
}
impl Default for CircuitBreaker {
	fn default() -> Self {
		Self::new(CircuitBreakerConfig::default())
	}
}
