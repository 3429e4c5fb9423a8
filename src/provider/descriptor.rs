//! Provider descriptor data structures and helpers shared by all collaborators.
//!
//! The module exposes validated endpoint metadata, the builder used to override it, and the
//! downstream operation labels so collaborators can describe their calls in a
//! transport-agnostic way.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Downstream operations issued against the provider.
pub mod operation;

pub use builder::*;
pub use operation::*;

// self
use crate::{_prelude::*, auth::ServiceAccount, error::ConfigError};

/// Default IAM Credentials API base URL.
pub const DEFAULT_IAM_CREDENTIALS_ENDPOINT: &str = "https://iamcredentials.googleapis.com/";
/// Default OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Default metadata server base URL.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal/";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// IAM Credentials API base (`generateAccessToken`, `generateIdToken`).
	pub iam_credentials: Url,
	/// Token endpoint used for refresh-token exchanges.
	pub token: Url,
	/// Metadata server base used on Google compute environments.
	pub metadata: Url,
}

/// Immutable provider descriptor consumed by collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Optional `User-Agent` sent with every request.
	#[serde(default)]
	pub user_agent: Option<String>,
}
impl ProviderDescriptor {
	/// Creates a new builder seeded with Google's public endpoints.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new()
	}

	/// Descriptor pointing at Google's public endpoints.
	pub fn google() -> Result<Self, ProviderDescriptorError> {
		Self::builder().build()
	}

	/// `generateAccessToken` URL for the target.
	pub fn generate_access_token_url(&self, target: &ServiceAccount) -> Result<Url> {
		self.iam_method_url(target, "generateAccessToken")
	}

	/// `generateIdToken` URL for the target.
	pub fn generate_id_token_url(&self, target: &ServiceAccount) -> Result<Url> {
		self.iam_method_url(target, "generateIdToken")
	}

	/// Metadata server token URL for the default service account.
	pub fn metadata_token_url(&self, scopes: &[&str]) -> Result<Url> {
		let mut url = join(&self.endpoints.metadata, METADATA_TOKEN_PATH)?;

		if !scopes.is_empty() {
			url.query_pairs_mut().append_pair("scopes", &scopes.join(","));
		}

		Ok(url)
	}

	/// Metadata server identity URL for the default service account.
	pub fn metadata_identity_url(&self, audience: &str) -> Result<Url> {
		let mut url = join(&self.endpoints.metadata, METADATA_IDENTITY_PATH)?;

		url.query_pairs_mut().append_pair("audience", audience).append_pair("format", "full");

		Ok(url)
	}

	// The email is pushed as one segment so `?`, `#`, and `/` in it are percent-encoded.
	fn iam_method_url(&self, target: &ServiceAccount, method: &str) -> Result<Url> {
		let mut url = self.endpoints.iam_credentials.clone();
		let resource = format!("{}:{method}", target.as_ref());

		url.set_query(None);
		url.set_fragment(None);
		url.path_segments_mut()
			.map_err(|()| ConfigError::InvalidDescriptor {
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			})?
			.pop_if_empty()
			.extend(["v1", "projects", "-", "serviceAccounts", resource.as_str()]);

		Ok(url)
	}
}

const METADATA_TOKEN_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/token";
const METADATA_IDENTITY_PATH: &str =
	"computeMetadata/v1/instance/service-accounts/default/identity";

fn join(base: &Url, path: &str) -> Result<Url> {
	base.join(path).map_err(|source| ConfigError::InvalidDescriptor { source }.into())
}
