//! HTTP message signing with a leaf certificate's private key.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{
	HeaderName, HeaderValue,
	header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST},
};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};
use time::macros::format_description;
// self
use crate::{_prelude::*, error::SigningError, http::TransportRequest};

/// Digest header carried on signed requests.
pub const CONTENT_SHA256_HEADER: &str = "x-content-sha256";
/// Pre-encoded SHA-256 digest of an empty body.
pub const EMPTY_BODY_SHA256: &str = "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";

const X_DATE_HEADER: &str = "x-date";
const SIGNATURE_VERSION: &str = "1";
const SIGNATURE_ALGORITHM: &str = "rsa-sha256";

/// Signs exchange requests with an RSA key bound to a leaf certificate.
///
/// The signature covers a canonical subset of headers (`date`,
/// `(request-target)`, `host`, `content-length`, `content-type`, and the body
/// digest) and is attached together with a key identifier of the form
/// `<tenancy>/fed-x509/<certificate-SHA-1-fingerprint>`.
pub struct CertificateRequestSigner {
	key_id: String,
	private_key: RsaPrivateKey,
}
impl CertificateRequestSigner {
	/// Creates a signer for the given tenancy, certificate fingerprint, and key.
	pub fn new(tenancy_id: &str, fingerprint: &str, private_key: RsaPrivateKey) -> Self {
		Self { key_id: format!("{tenancy_id}/fed-x509/{fingerprint}"), private_key }
	}

	/// Returns the key identifier attached to signed requests.
	pub fn key_id(&self) -> &str {
		&self.key_id
	}

	/// Adds digest, default, and signature headers to the request.
	pub fn sign(&self, request: &mut TransportRequest) -> Result<(), SigningError> {
		self.ensure_headers(request)?;

		// Callers may stamp x-date themselves; it then replaces date in the
		// signed set.
		let date_header =
			if request.headers.contains_key(X_DATE_HEADER) { X_DATE_HEADER } else { "date" };
		let signed_headers = [
			date_header,
			"(request-target)",
			"host",
			"content-length",
			"content-type",
			CONTENT_SHA256_HEADER,
		];
		let signing_string = self.signing_string(request, &signed_headers)?;
		let digest = Sha256::digest(signing_string.as_bytes());
		let signature = self
			.private_key
			.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
			.map_err(|source| SigningError::Signature { source })?;
		let authorization = format!(
			"Signature version=\"{SIGNATURE_VERSION}\",headers=\"{}\",keyId=\"{}\",algorithm=\"{SIGNATURE_ALGORITHM}\",signature=\"{}\"",
			signed_headers.join(" "),
			self.key_id,
			STANDARD.encode(signature),
		);

		request.headers.insert(
			AUTHORIZATION,
			HeaderValue::from_str(&authorization)
				.map_err(|_| SigningError::HeaderValue { header: "authorization".into() })?,
		);

		Ok(())
	}

	fn ensure_headers(&self, request: &mut TransportRequest) -> Result<(), SigningError> {
		let digest = if request.body.is_empty() {
			EMPTY_BODY_SHA256.to_owned()
		} else {
			STANDARD.encode(Sha256::digest(&request.body))
		};

		set_header(request, HeaderName::from_static(CONTENT_SHA256_HEADER), &digest, true)?;

		if !request.headers.contains_key(X_DATE_HEADER) && !request.headers.contains_key(DATE) {
			let format = format_description!(
				"[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
			);
			let now = OffsetDateTime::now_utc()
				.format(&format)
				.map_err(|_| SigningError::HeaderValue { header: "date".into() })?;

			set_header(request, DATE, &now, true)?;
		}

		let host = request.uri.host_str().ok_or(SigningError::MissingHost)?;
		let host = match request.uri.port() {
			Some(port) => format!("{host}:{port}"),
			None => host.to_owned(),
		};

		let content_length = request.body.len().to_string();

		set_header(request, HOST, &host, false)?;
		set_header(request, CONTENT_TYPE, "application/json", false)?;
		set_header(request, CONTENT_LENGTH, &content_length, true)?;

		Ok(())
	}

	fn signing_string(
		&self,
		request: &TransportRequest,
		signed_headers: &[&'static str],
	) -> Result<String, SigningError> {
		let mut lines = Vec::with_capacity(signed_headers.len());

		for &name in signed_headers {
			if name == "(request-target)" {
				let target = match request.uri.query() {
					Some(query) => format!("{}?{query}", request.uri.path()),
					None => request.uri.path().to_owned(),
				};

				lines.push(format!(
					"(request-target): {} {target}",
					request.method.as_str().to_lowercase(),
				));

				continue;
			}

			let value = request
				.headers
				.get(name)
				.and_then(|value| value.to_str().ok())
				.ok_or_else(|| SigningError::HeaderValue { header: name.to_owned() })?;

			lines.push(format!("{name}: {value}"));
		}

		Ok(lines.join("\n"))
	}
}
impl Debug for CertificateRequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CertificateRequestSigner").field("key_id", &self.key_id).finish()
	}
}

fn set_header(
	request: &mut TransportRequest,
	name: HeaderName,
	value: &str,
	replace: bool,
) -> Result<(), SigningError> {
	if !replace && request.headers.contains_key(&name) {
		return Ok(());
	}

	let value = HeaderValue::from_str(value)
		.map_err(|_| SigningError::HeaderValue { header: name.as_str().to_owned() })?;

	request.headers.insert(name, value);

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use rsa::{RsaPublicKey, pkcs8::DecodePrivateKey, signature::hazmat::PrehashVerifier};
	// self
	use super::*;

	const LEAF_KEY: &str = include_str!("../../tests/fixtures/leaf_key.pem");
	const TENANCY: &str = "ocid1.tenancy.oc1..aaaatestfixture";
	const FINGERPRINT: &str = "7E:3D:17:03:80:31:1B:4F:C5:2B:E0:0F:76:74:85:BA:AB:3F:43:E1";

	fn signer() -> CertificateRequestSigner {
		let key = RsaPrivateKey::from_pkcs8_pem(LEAF_KEY).expect("Fixture key should parse.");

		CertificateRequestSigner::new(TENANCY, FINGERPRINT, key)
	}

	fn request(body: &[u8]) -> TransportRequest {
		TransportRequest::post(
			Url::parse("https://auth.region.example.com/v1/x509").expect("Fixture URL should parse."),
			body.to_vec(),
		)
	}

	#[test]
	fn key_id_embeds_tenancy_and_fingerprint() {
		assert_eq!(signer().key_id(), format!("{TENANCY}/fed-x509/{FINGERPRINT}"));
	}

	#[test]
	fn signing_fills_required_headers() {
		let mut request = request(b"{\"certificate\":\"...\"}");

		signer().sign(&mut request).expect("Signing should succeed.");

		for header in ["date", "host", "content-type", "content-length", CONTENT_SHA256_HEADER] {
			assert!(request.headers.contains_key(header), "missing header {header}");
		}

		let authorization = request
			.headers
			.get(AUTHORIZATION)
			.expect("Authorization header should be set.")
			.to_str()
			.expect("Authorization header should be readable.");

		assert!(authorization.starts_with("Signature version=\"1\""));
		assert!(authorization.contains("algorithm=\"rsa-sha256\""));
		assert!(authorization.contains(&format!("keyId=\"{TENANCY}/fed-x509/{FINGERPRINT}\"")));
		assert!(authorization.contains(
			"headers=\"date (request-target) host content-length content-type x-content-sha256\""
		));
	}

	#[test]
	fn empty_bodies_use_the_well_known_digest() {
		let mut request = request(b"");

		signer().sign(&mut request).expect("Signing should succeed.");

		assert_eq!(
			request
				.headers
				.get(CONTENT_SHA256_HEADER)
				.expect("Digest header should be set.")
				.to_str()
				.expect("Digest header should be readable."),
			EMPTY_BODY_SHA256,
		);
	}

	#[test]
	fn signature_verifies_against_the_public_key() {
		let key = RsaPrivateKey::from_pkcs8_pem(LEAF_KEY).expect("Fixture key should parse.");
		let public = RsaPublicKey::from(&key);
		let signer = CertificateRequestSigner::new(TENANCY, FINGERPRINT, key);
		let mut request = request(b"payload");

		signer.sign(&mut request).expect("Signing should succeed.");

		let authorization = request
			.headers
			.get(AUTHORIZATION)
			.expect("Authorization header should be set.")
			.to_str()
			.expect("Authorization header should be readable.");
		let signature_b64 = authorization
			.split("signature=\"")
			.nth(1)
			.and_then(|rest| rest.strip_suffix('"'))
			.expect("Authorization header should end with the signature.");
		let signature = STANDARD.decode(signature_b64).expect("Signature should be base64.");
		let signed_headers = canonical_headers();
		let signing_string = signer
			.signing_string(&request, &signed_headers)
			.expect("Signing string should rebuild.");
		let digest = Sha256::digest(signing_string.as_bytes());
		let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public);

		verifying_key
			.verify_prehash(
				&digest,
				&rsa::pkcs1v15::Signature::try_from(signature.as_slice())
					.expect("Signature bytes should convert."),
			)
			.expect("Signature should verify against the session public key.");
	}

	fn canonical_headers() -> [&'static str; 6] {
		[
			"date",
			"(request-target)",
			"host",
			"content-length",
			"content-type",
			CONTENT_SHA256_HEADER,
		]
	}

	#[test]
	fn caller_supplied_x_date_replaces_date() {
		let mut request = request(b"body");

		request.headers.insert(
			HeaderName::from_static("x-date"),
			HeaderValue::from_static("Thu, 05 Jan 2034 21:31:40 GMT"),
		);
		signer().sign(&mut request).expect("Signing should succeed.");

		let authorization = request
			.headers
			.get(AUTHORIZATION)
			.expect("Authorization header should be set.")
			.to_str()
			.expect("Authorization header should be readable.");

		assert!(authorization.contains("headers=\"x-date (request-target)"));
		assert!(!request.headers.contains_key("date"));
	}

	#[test]
	fn unreadable_header_errors_name_the_header() {
		let mut request = request(b"body");

		// Opaque bytes are legal in a header value but not representable as a
		// string, so the signing string cannot include them.
		request.headers.insert(
			HeaderName::from_static("x-date"),
			HeaderValue::from_bytes(&[0xF0]).expect("Opaque header bytes should be accepted."),
		);

		let error = signer().sign(&mut request).expect_err("Signing should fail.");

		assert!(matches!(error, SigningError::HeaderValue { ref header } if header == "x-date"));
	}
}
