//! Issued credential model returned to callers after a successful downstream call.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret, request::Lifetime};

/// Kind of credential produced by the issuer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	/// OAuth 2.0 access token.
	AccessToken,
	/// OIDC identity token (JWT).
	IdentityToken,
}
impl CredentialKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::AccessToken => "access_token",
			CredentialKind::IdentityToken => "identity_token",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Ephemeral credential owned by the caller; the broker keeps no copy.
#[derive(Clone)]
pub struct IssuedCredential {
	/// Credential kind.
	pub kind: CredentialKind,
	/// Token value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Expiry instant reported by the provider or decoded from the token, when known.
	pub expires_at: Option<OffsetDateTime>,
	/// Effective lifetime requested for access tokens.
	pub lifetime: Option<Lifetime>,
}
impl IssuedCredential {
	/// Builds an access-token credential.
	pub fn access_token(
		value: TokenSecret,
		expires_at: Option<OffsetDateTime>,
		lifetime: Lifetime,
	) -> Self {
		Self { kind: CredentialKind::AccessToken, value, expires_at, lifetime: Some(lifetime) }
	}

	/// Builds an identity-token credential, decoding the `exp` claim when the token is a JWT.
	pub fn identity_token(value: TokenSecret) -> Self {
		let expires_at = jwt_expiry(value.expose());

		Self { kind: CredentialKind::IdentityToken, value, expires_at, lifetime: None }
	}

	/// Returns `true` if the credential has expired at the provided instant.
	///
	/// Credentials without a known expiry are never reported as expired.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expiry| instant >= expiry)
	}
}
impl Debug for IssuedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedCredential")
			.field("kind", &self.kind)
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

#[derive(Deserialize)]
struct JwtClaims {
	exp: Option<i64>,
}

/// Reads the `exp` claim from a compact JWT without verifying its signature.
pub(crate) fn jwt_expiry(token: &str) -> Option<OffsetDateTime> {
	let mut segments = token.split('.');
	let (_header, payload) = (segments.next()?, segments.next()?);

	segments.next()?;

	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claims = serde_json::from_slice::<JwtClaims>(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn jwt(payload: &str) -> String {
		format!(
			"{}.{}.signature",
			URL_SAFE_NO_PAD.encode("{\"alg\":\"RS256\"}"),
			URL_SAFE_NO_PAD.encode(payload)
		)
	}

	#[test]
	fn identity_tokens_decode_expiry() {
		let credential = IssuedCredential::identity_token(TokenSecret::new(jwt(
			"{\"aud\":\"https://service.example.com\",\"exp\":1700000000}",
		)));

		assert_eq!(credential.kind, CredentialKind::IdentityToken);
		assert_eq!(
			credential.expires_at,
			Some(
				OffsetDateTime::from_unix_timestamp(1_700_000_000)
					.expect("Fixture timestamp should be valid.")
			)
		);
		assert!(credential.is_expired_at(
			OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Timestamp should be valid.")
		));
	}

	#[test]
	fn opaque_tokens_have_no_expiry() {
		assert!(jwt_expiry("opaque-token").is_none());
		assert!(jwt_expiry("a.b").is_none());
		assert!(jwt_expiry(&jwt("{\"aud\":\"x\"}")).is_none());
		assert!(jwt_expiry("a.!!!.c").is_none());
	}

	#[test]
	fn debug_redacts_value() {
		let credential = IssuedCredential::identity_token(TokenSecret::new("opaque-token"));
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("opaque-token"));
		assert!(rendered.contains("<redacted>"));
		assert!(!credential.is_expired_at(OffsetDateTime::now_utc()));
	}
}
