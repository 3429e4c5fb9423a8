//! Redacting wrapper for issued token values and caller credentials.

// self
use crate::_prelude::*;

/// Sensitive token material that never renders through `Debug` or `Display`.
///
/// Access tokens, identity tokens, and refresh tokens all travel in this wrapper so an
/// accidental `{:?}` in a span or panic message cannot leak them.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Consumes the wrapper and hands the raw value to the caller.
	pub fn into_exposed(self) -> String {
		self.0
	}

	/// Returns true when the provider handed back an empty token.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("ya29.super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "ya29.super-secret");
	}

	#[test]
	fn secret_deserializes_transparently() {
		let secret: TokenSecret =
			serde_json::from_str("\"eyJhbGciOi\"").expect("Secret should deserialize from a string.");

		assert_eq!(secret.into_exposed(), "eyJhbGciOi");
	}
}
