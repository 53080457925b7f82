//! Ephemeral session key pairs bound to issued security tokens.

// crates.io
use rsa::{
	RsaPrivateKey,
	pkcs8::{EncodePublicKey, LineEnding},
};
// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`SessionKeySupplier::refresh_keys`].
pub type SessionKeyFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Default RSA modulus size for session key pairs.
pub const DEFAULT_SESSION_KEY_BITS: usize = 2048;

/// Asymmetric key pair proving possession of an issued security token.
///
/// A token is only meaningful paired with the material active when it was
/// issued; both are replaced atomically within the same refresh cycle.
#[derive(Clone)]
pub struct SessionKeyMaterial {
	/// PEM-encoded SPKI public key embedded in exchange requests.
	pub public_key_pem: String,
	/// Private half backing proof-of-possession signatures.
	pub private_key: RsaPrivateKey,
	/// Instant the pair was generated.
	pub created_at: OffsetDateTime,
}
impl Debug for SessionKeyMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionKeyMaterial")
			.field("public_key_pem", &self.public_key_pem)
			.field("private_key", &"<redacted>")
			.field("created_at", &self.created_at)
			.finish()
	}
}

/// Supplier of the session key pair owned by one federation client.
pub trait SessionKeySupplier
where
	Self: Send + Sync,
{
	/// Regenerates the pair; called at the start of every refresh cycle, before
	/// the network call, so the public key embedded in the exchange request
	/// matches the pair backing the returned token.
	fn refresh_keys(&self) -> SessionKeyFuture<'_>;

	/// Returns a snapshot of the current pair.
	fn key_pair(&self) -> SessionKeyMaterial;
}

/// In-process RSA supplier; generates a fresh pair per refresh cycle.
pub struct RsaSessionKeySupplier {
	bits: usize,
	slot: Mutex<SessionKeyMaterial>,
}
impl RsaSessionKeySupplier {
	/// Creates a supplier with the default modulus size.
	pub fn new() -> Result<Self> {
		Self::with_bits(DEFAULT_SESSION_KEY_BITS)
	}

	/// Creates a supplier with an explicit modulus size.
	pub fn with_bits(bits: usize) -> Result<Self> {
		Ok(Self { bits, slot: Mutex::new(Self::generate(bits)?) })
	}

	fn generate(bits: usize) -> Result<SessionKeyMaterial> {
		let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
			.map_err(|e| ConfigError::KeyGeneration { source: e.into() })?;
		let public_key_pem = private_key
			.to_public_key()
			.to_public_key_pem(LineEnding::LF)
			.map_err(|e| ConfigError::KeyGeneration { source: e.into() })?;

		Ok(SessionKeyMaterial { public_key_pem, private_key, created_at: OffsetDateTime::now_utc() })
	}
}
impl SessionKeySupplier for RsaSessionKeySupplier {
	fn refresh_keys(&self) -> SessionKeyFuture<'_> {
		Box::pin(async move {
			let material = Self::generate(self.bits)?;

			*self.slot.lock() = material;

			Ok(())
		})
	}

	fn key_pair(&self) -> SessionKeyMaterial {
		self.slot.lock().clone()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	// 1024-bit keys keep generation fast; production callers use the default.
	const TEST_BITS: usize = 1024;

	#[tokio::test]
	async fn refresh_rotates_the_pair() {
		let supplier = RsaSessionKeySupplier::with_bits(TEST_BITS)
			.expect("Session key supplier should construct.");
		let before = supplier.key_pair();

		supplier.refresh_keys().await.expect("Key refresh should succeed.");

		let after = supplier.key_pair();

		assert_ne!(before.public_key_pem, after.public_key_pem);
		assert!(after.created_at >= before.created_at);
	}

	#[test]
	fn public_key_is_pem_encoded() {
		let supplier = RsaSessionKeySupplier::with_bits(TEST_BITS)
			.expect("Session key supplier should construct.");
		let material = supplier.key_pair();

		assert!(material.public_key_pem.starts_with("-----BEGIN PUBLIC KEY-----"));
		assert!(!format!("{material:?}").contains("PRIVATE"));
	}
}
