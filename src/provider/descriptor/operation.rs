// self
use crate::_prelude::*;

/// Downstream operations the broker issues against the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
	/// IAM Credentials `generateAccessToken`.
	GenerateAccessToken,
	/// IAM Credentials `generateIdToken`.
	GenerateIdToken,
	/// Metadata server access-token fetch.
	MetadataToken,
	/// Metadata server identity-token fetch.
	MetadataIdentity,
	/// OAuth 2.0 refresh-token grant for authorized-user credentials.
	RefreshToken,
	/// JWT bearer grant for an access token signed by a service account key.
	ServiceAccountToken,
	/// JWT bearer grant for an identity token signed by a service account key.
	ServiceAccountIdentity,
}
impl Operation {
	/// Returns a stable label suitable for error messages and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::GenerateAccessToken => "generateAccessToken",
			Operation::GenerateIdToken => "generateIdToken",
			Operation::MetadataToken => "metadata token",
			Operation::MetadataIdentity => "metadata identity",
			Operation::RefreshToken => "refresh_token",
			Operation::ServiceAccountToken => "service account token",
			Operation::ServiceAccountIdentity => "service account identity",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
