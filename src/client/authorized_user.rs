//! `authorized_user` application-default credentials.
//!
//! These are the credentials `gcloud auth application-default login` writes: an OAuth client
//! plus a long-lived refresh token. Access tokens are obtained through the refresh-token grant.

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	client::{
		self, AmbientCredentials, ClientFuture, CredentialProvider, CredentialSource, IssueOptions,
	},
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{BasicFacade, OAuth2Facade, TransportErrorMapper},
	provider::{DefaultProviderStrategy, ProviderDescriptor, ProviderStrategy},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

const AUTHORIZED_USER_TYPE: &str = "authorized_user";

#[cfg(feature = "reqwest")]
/// Authorized-user provider specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthorizedUserProvider =
	AuthorizedUserProvider<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Parsed `authorized_user` credentials file.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizedUserCredentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Long-lived refresh token.
	pub refresh_token: TokenSecret,
}
impl AuthorizedUserCredentials {
	/// Parses credentials JSON, rejecting other credential types.
	pub fn from_json(json: &str) -> Result<Self> {
		client::parse_credentials(json, AUTHORIZED_USER_TYPE)
	}

	/// Reads and parses a credentials file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let json = fs::read_to_string(path).map_err(ConfigError::from)?;

		Self::from_json(&json)
	}
}

/// [`CredentialProvider`] that refreshes `authorized_user` credentials on every call.
pub struct AuthorizedUserProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	credentials: AuthorizedUserCredentials,
	facade: BasicFacade<C, M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> AuthorizedUserProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a provider that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: &ProviderDescriptor,
		credentials: AuthorizedUserCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let facade = BasicFacade::from_descriptor(
			descriptor,
			&credentials.client_id,
			credentials.client_secret.expose(),
			http_client,
			mapper,
		)?;

		Ok(Self { credentials, facade, strategy: Arc::new(DefaultProviderStrategy) })
	}

	/// Replaces the error classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Parsed credentials backing the provider.
	pub fn credentials(&self) -> &AuthorizedUserCredentials {
		&self.credentials
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizedUserProvider<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a provider with its own reqwest-backed transport.
	pub fn new(
		descriptor: &ProviderDescriptor,
		credentials: AuthorizedUserCredentials,
	) -> Result<Self> {
		Self::with_http_client(
			descriptor,
			credentials,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> CredentialProvider for AuthorizedUserProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn ambient_credentials<'a>(
		&'a self,
		_scopes: &'a ScopeSet,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, AmbientCredentials> {
		Box::pin(async move {
			let refreshed = self
				.facade
				.refresh_token(
					self.strategy.as_ref(),
					self.credentials.refresh_token.expose(),
					options.timeout,
				)
				.await?;

			Ok(AmbientCredentials {
				access_token: refreshed.access_token,
				expires_at: Some(refreshed.expires_at),
				source: CredentialSource::AuthorizedUser,
			})
		})
	}
}
impl<C, M> Debug for AuthorizedUserProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedUserProvider").field("credentials", &self.credentials).finish()
	}
}
