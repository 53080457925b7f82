//! Authentication provider facade consumed by request-signing layers.

// self
use crate::{_prelude::*, auth::SecurityToken, client::FederationClient};

/// Region the provider's federation endpoint lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region(pub String);
impl Region {
	/// Returns the region identifier.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for Region {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl From<&str> for Region {
	fn from(region: &str) -> Self {
		Self(region.to_owned())
	}
}
impl From<String> for Region {
	fn from(region: String) -> Self {
		Self(region)
	}
}

/// Couples a federation client with its region and renders the key identifier
/// request signers place in signed headers.
#[derive(Clone)]
pub struct FederationAuthenticationProvider {
	client: Arc<dyn FederationClient>,
	region: Region,
}
impl Debug for FederationAuthenticationProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FederationAuthenticationProvider").field("region", &self.region).finish()
	}
}
impl FederationAuthenticationProvider {
	/// Wraps a federation client for the given region.
	pub fn new(client: Arc<dyn FederationClient>, region: impl Into<Region>) -> Self {
		Self { client, region: region.into() }
	}

	/// Returns the provider's region.
	pub fn region(&self) -> &Region {
		&self.region
	}

	/// Returns a valid security token, refreshing through the underlying client
	/// when the cached one has expired.
	pub async fn security_token(&self) -> Result<SecurityToken> {
		self.client.security_token().await
	}

	/// Forces a refresh through the underlying client.
	pub async fn refresh_security_token(&self) -> Result<SecurityToken> {
		self.client.refresh_security_token().await
	}

	/// Ensures a valid token, then reads one claim from it.
	pub async fn string_claim(&self, key: &str) -> Result<Option<String>> {
		self.client.string_claim(key).await
	}

	/// Returns the signing key identifier for the current token, in the
	/// `ST$<token>` form request signers embed in the `keyId` parameter.
	pub async fn key_id(&self) -> Result<String> {
		Ok(format!("ST${}", self.security_token().await?.raw()))
	}
}
