// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	provider::{
		DEFAULT_IAM_CREDENTIALS_ENDPOINT, DEFAULT_METADATA_ENDPOINT, DEFAULT_TOKEN_ENDPOINT,
		ProviderDescriptor, ProviderEndpoints,
	},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// A default endpoint failed to parse.
	#[error("The default {endpoint} endpoint is not a valid URL.")]
	InvalidDefault {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
	},
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint uses a scheme other than HTTP(S).
	#[error("The {endpoint} endpoint must use HTTP or HTTPS: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint cannot serve as a base for relative paths.
	#[error("The {endpoint} endpoint cannot be used as a base URL: {url}.")]
	NotABase {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// User agent contains characters that cannot appear in a header.
	#[error("User agent must be printable ASCII.")]
	InvalidUserAgent,
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	/// IAM Credentials API base override.
	pub iam_credentials_endpoint: Option<Url>,
	/// Token endpoint override.
	pub token_endpoint: Option<Url>,
	/// Metadata server base override.
	pub metadata_endpoint: Option<Url>,
	/// Optional `User-Agent` header value.
	pub user_agent: Option<String>,
}
impl ProviderDescriptorBuilder {
	/// Creates a builder that falls back to Google's public endpoints.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the IAM Credentials API base URL.
	pub fn iam_credentials_endpoint(mut self, url: Url) -> Self {
		self.iam_credentials_endpoint = Some(url);

		self
	}

	/// Overrides the OAuth token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the metadata server base URL.
	pub fn metadata_endpoint(mut self, url: Url) -> Self {
		self.metadata_endpoint = Some(url);

		self
	}

	/// Sets the `User-Agent` header value.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let iam_credentials = resolve(
			"iam_credentials",
			self.iam_credentials_endpoint,
			DEFAULT_IAM_CREDENTIALS_ENDPOINT,
		)?;
		let token = resolve("token", self.token_endpoint, DEFAULT_TOKEN_ENDPOINT)?;
		let metadata = resolve("metadata", self.metadata_endpoint, DEFAULT_METADATA_ENDPOINT)?;
		let descriptor = ProviderDescriptor {
			endpoints: ProviderEndpoints {
				iam_credentials: with_trailing_slash(iam_credentials),
				token,
				metadata: with_trailing_slash(metadata),
			},
			user_agent: self.user_agent,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_secure_endpoint("iam_credentials", &self.endpoints.iam_credentials)?;
		validate_secure_endpoint("token", &self.endpoints.token)?;
		validate_metadata_endpoint(&self.endpoints.metadata)?;

		if self
			.user_agent
			.as_deref()
			.is_some_and(|ua| !ua.chars().all(|c| c.is_ascii() && !c.is_ascii_control()))
		{
			return Err(ProviderDescriptorError::InvalidUserAgent);
		}

		Ok(())
	}
}

fn resolve(
	endpoint: &'static str,
	url: Option<Url>,
	default: &str,
) -> Result<Url, ProviderDescriptorError> {
	match url {
		Some(url) => Ok(url),
		None => Url::parse(default).map_err(|_| ProviderDescriptorError::InvalidDefault { endpoint }),
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

fn validate_secure_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(ProviderDescriptorError::NotABase { endpoint: name, url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ =>
			Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn validate_metadata_endpoint(url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(ProviderDescriptorError::NotABase {
			endpoint: "metadata",
			url: url.to_string(),
		});
	}

	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ProviderDescriptorError::UnsupportedScheme {
			endpoint: "metadata",
			url: url.to_string(),
		}),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.is_ok_and(|ip| ip.is_loopback()),
		None => false,
	}
}
