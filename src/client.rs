//! Downstream collaborators consumed by the issuer.
//!
//! The issuer never talks HTTP itself. It receives three collaborators at construction time:
//! a [`CredentialProvider`] for the caller's ambient credentials, an [`ImpersonationClient`]
//! for the IAM Credentials API, and an [`IdentityTokenExchanger`] for identity tokens minted
//! from ambient credentials. All hooks return boxed `Send` futures; dropping the future
//! cancels the call.

pub mod authorized_user;
pub mod iam;
pub mod metadata;
pub mod service_account;

mod exchange;

pub use authorized_user::*;
pub use iam::*;
pub use metadata::*;
pub use service_account::*;

// crates.io
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccount, TokenSecret},
	error::ConfigError,
	request::Lifetime,
};

/// Boxed future returned by collaborator hooks.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Per-call options forwarded to every downstream request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IssueOptions {
	/// Upper bound for each downstream HTTP call.
	pub timeout: Option<StdDuration>,
}
impl IssueOptions {
	/// Options bounded by `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Self {
		Self { timeout: Some(timeout) }
	}
}

/// Where ambient credentials came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
	/// Token supplied directly by the caller.
	Static,
	/// Google compute metadata server.
	MetadataServer,
	/// Refresh-token exchange for `authorized_user` credentials.
	AuthorizedUser,
	/// JWT bearer exchange signed by a `service_account` key.
	ServiceAccountKey,
}
impl CredentialSource {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialSource::Static => "static",
			CredentialSource::MetadataServer => "metadata_server",
			CredentialSource::AuthorizedUser => "authorized_user",
			CredentialSource::ServiceAccountKey => "service_account_key",
		}
	}
}
impl Display for CredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// The caller's own credentials, used to authenticate downstream calls.
#[derive(Clone, Debug)]
pub struct AmbientCredentials {
	/// Bearer access token.
	pub access_token: TokenSecret,
	/// Expiry, when reported.
	pub expires_at: Option<OffsetDateTime>,
	/// Origin of the credentials.
	pub source: CredentialSource,
}

/// Supplies the caller's ambient credentials.
pub trait CredentialProvider: Send + Sync {
	/// Fetches credentials valid for `scopes`.
	fn ambient_credentials<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, AmbientCredentials>;
}

/// Exchanges ambient credentials for an identity token bound to an audience.
pub trait IdentityTokenExchanger: Send + Sync {
	/// Mints an identity token for `audience` using `credentials`.
	fn exchange<'a>(
		&'a self,
		audience: &'a str,
		credentials: &'a AmbientCredentials,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, GeneratedIdToken>;
}

/// IAM Credentials API operations used for impersonation.
pub trait ImpersonationClient: Send + Sync {
	/// `generateAccessToken` against `target`.
	fn generate_access_token<'a>(
		&'a self,
		target: &'a ServiceAccount,
		request: &'a GenerateAccessTokenRequest,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, GeneratedAccessToken>;

	/// `generateIdToken` against `target`.
	fn generate_id_token<'a>(
		&'a self,
		target: &'a ServiceAccount,
		request: &'a GenerateIdTokenRequest,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, GeneratedIdToken>;
}

/// Body of `generateAccessToken`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccessTokenRequest {
	/// Delegation chain, first hop to last.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub delegates: Vec<String>,
	/// Canonical scopes.
	pub scope: Vec<String>,
	/// Requested lifetime (`3600s`).
	pub lifetime: Lifetime,
}

/// Body of `generateIdToken`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIdTokenRequest {
	/// Delegation chain, first hop to last.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub delegates: Vec<String>,
	/// Audience claim.
	pub audience: String,
	/// Whether to include the `email` claim.
	pub include_email: bool,
}

/// Response of `generateAccessToken`.
#[derive(Clone, Debug)]
pub struct GeneratedAccessToken {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Expiry reported by the provider.
	pub expire_time: Option<OffsetDateTime>,
}
impl<'de> Deserialize<'de> for GeneratedAccessToken {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(rename_all = "camelCase")]
		struct Wire {
			access_token: TokenSecret,
			#[serde(default)]
			expire_time: Option<String>,
		}

		let wire = Wire::deserialize(deserializer)?;
		let expire_time = wire
			.expire_time
			.map(|raw| OffsetDateTime::parse(&raw, &Rfc3339))
			.transpose()
			.map_err(serde::de::Error::custom)?;

		Ok(Self { access_token: wire.access_token, expire_time })
	}
}

/// Identity token returned by `generateIdToken` or an exchanger.
#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedIdToken {
	/// Issued identity token (JWT).
	pub token: TokenSecret,
}

/// Provider that always returns the same caller access token.
#[derive(Clone, Debug)]
pub struct StaticCredentialProvider {
	access_token: TokenSecret,
	expires_at: Option<OffsetDateTime>,
}
impl StaticCredentialProvider {
	/// Wraps an externally obtained access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at: None }
	}

	/// Records the token's expiry.
	pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}
}
impl CredentialProvider for StaticCredentialProvider {
	fn ambient_credentials<'a>(
		&'a self,
		_scopes: &'a ScopeSet,
		_options: &'a IssueOptions,
	) -> ClientFuture<'a, AmbientCredentials> {
		Box::pin(async move {
			Ok(AmbientCredentials {
				access_token: self.access_token.clone(),
				expires_at: self.expires_at,
				source: CredentialSource::Static,
			})
		})
	}
}

/// Parses a credentials JSON document whose `type` must equal `expected`.
pub(crate) fn parse_credentials<T>(json: &str, expected: &'static str) -> Result<T>
where
	T: DeserializeOwned,
{
	#[derive(Deserialize)]
	struct Kind {
		#[serde(rename = "type")]
		kind: Option<String>,
	}

	let kind = parse_credentials_json::<Kind>(json)?.kind.unwrap_or_default();

	if kind != expected {
		return Err(ConfigError::UnsupportedCredentialsType { kind, expected }.into());
	}

	parse_credentials_json(json)
}

fn parse_credentials_json<T>(json: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(json);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ConfigError::CredentialsParse { source }.into())
}
