//! Certificate suppliers and leaf-certificate parsing helpers.
//!
//! Suppliers declare their refresh capability at construction through
//! [`Refreshability`] instead of being probed at call time; the certificate
//! federation client re-acquires every refreshable supplier at the start of
//! each refresh cycle.

// crates.io
use sha1::{Digest, Sha1};
use x509_parser::prelude::*;
// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`CertificateSupplier::refresh`].
pub type CertificateFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Whether a supplier can re-acquire fresh material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refreshability {
	/// `refresh` re-acquires material that may rotate between cycles.
	Refreshable,
	/// Material is fixed for the supplier's lifetime; `refresh` is a no-op.
	Static,
}

/// Certificate material snapshot handed to federation clients.
#[derive(Clone)]
pub struct CertificateMaterial {
	/// PEM-encoded certificate.
	pub certificate_pem: String,
	/// Private key matching the certificate, when the supplier holds one.
	/// Intermediate suppliers carry none.
	pub private_key: Option<rsa::RsaPrivateKey>,
}
impl Debug for CertificateMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CertificateMaterial")
			.field("certificate_pem", &self.certificate_pem)
			.field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Source of certificate material for the certificate-exchange client.
pub trait CertificateSupplier
where
	Self: Send + Sync,
{
	/// Returns a snapshot of the current material.
	fn material(&self) -> CertificateMaterial;

	/// Re-acquires material; called once per refresh cycle for
	/// [`Refreshability::Refreshable`] suppliers.
	fn refresh(&self) -> CertificateFuture<'_>;

	/// Capability declared at construction.
	fn refreshability(&self) -> Refreshability;
}

/// Supplier over fixed PEM material; validated once at construction.
#[derive(Debug)]
pub struct StaticCertificateSupplier {
	material: CertificateMaterial,
}
impl StaticCertificateSupplier {
	/// Wraps pre-loaded PEM material, rejecting unparsable certificates.
	pub fn new(
		certificate_pem: impl Into<String>,
		private_key: Option<rsa::RsaPrivateKey>,
	) -> Result<Self> {
		let certificate_pem = certificate_pem.into();

		certificate_der(&certificate_pem)?;

		Ok(Self { material: CertificateMaterial { certificate_pem, private_key } })
	}
}
impl CertificateSupplier for StaticCertificateSupplier {
	fn material(&self) -> CertificateMaterial {
		self.material.clone()
	}

	fn refresh(&self) -> CertificateFuture<'_> {
		Box::pin(async { Ok(()) })
	}

	fn refreshability(&self) -> Refreshability {
		Refreshability::Static
	}
}

/// Strips PEM armor and whitespace so the material can be embedded in wire
/// payloads.
pub fn sanitize_pem(pem: &str) -> String {
	pem.lines().filter(|line| !line.starts_with("-----")).collect::<Vec<_>>().concat()
}

/// Decodes the first PEM block into DER bytes.
pub fn certificate_der(pem: &str) -> Result<Vec<u8>, ConfigError> {
	let (_, parsed) = parse_x509_pem(pem.as_bytes())
		.map_err(|e| ConfigError::InvalidCertificate { message: e.to_string() })?;

	Ok(parsed.contents)
}

/// Computes the colon-separated uppercase SHA-1 fingerprint of a DER
/// certificate, as embedded in signing key identifiers.
pub fn fingerprint(der: &[u8]) -> String {
	Sha1::digest(der)
		.iter()
		.map(|byte| format!("{byte:02X}"))
		.collect::<Vec<_>>()
		.join(":")
}

/// Extracts the tenancy identifier from a leaf certificate's subject.
///
/// Issued instance certificates carry the tenancy as a subject attribute value
/// prefixed `opc-tenant:` (older generations use `opc-identity:`).
pub fn tenancy_id(der: &[u8]) -> Result<Option<String>, ConfigError> {
	let (_, certificate) = X509Certificate::from_der(der)
		.map_err(|e| ConfigError::InvalidCertificate { message: e.to_string() })?;

	for attribute in certificate.subject().iter_attributes() {
		let Ok(value) = attribute.as_str() else {
			continue;
		};

		if let Some(id) = value.strip_prefix("opc-tenant:") {
			return Ok(Some(id.to_owned()));
		}
		if let Some(id) = value.strip_prefix("opc-identity:") {
			return Ok(Some(id.to_owned()));
		}
	}

	Ok(None)
}
